//! TTL cache for the resource index.
//!
//! The cache holds the last successfully fetched index and serves it without
//! I/O until it expires. A refresh that fails falls back to the previous
//! index (stale-read-on-error) unless the caller forced a fresh copy.
//!
//! Readers clone an `Arc` under a read lock, so a concurrent refresh swaps
//! the whole index atomically and can never expose a partially updated one.
//! Refreshes themselves serialize on a dedicated gate so at most one fetch
//! is in flight; the gate is never held across reads.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use super::fetch::IndexFetcher;
use super::ResourceIndex;

struct CachedIndex {
    index: Arc<ResourceIndex>,
    expires_at: Instant,
}

/// Cached access to the remote resource index.
pub struct IndexCache {
    fetcher: IndexFetcher,
    url: String,
    ttl: Duration,
    current: RwLock<Option<CachedIndex>>,
    refresh_gate: Mutex<()>,
}

impl IndexCache {
    /// Create a cache that fetches `url` and keeps results fresh for `ttl`.
    pub fn new(fetcher: IndexFetcher, url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            fetcher,
            url: url.into(),
            ttl,
            current: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Get the resource index.
    ///
    /// Returns the cached index when present and unexpired (no I/O), unless
    /// `force_refresh` is set. Otherwise fetches; on fetch failure the
    /// previous index is returned as a degraded fallback, or `None` when
    /// there is no previous index or the refresh was forced.
    pub fn get(&self, force_refresh: bool) -> Option<Arc<ResourceIndex>> {
        if !force_refresh {
            if let Some(index) = self.fresh() {
                trace!(entries = index.len(), "returning cached resource index");
                return Some(index);
            }
        }

        // One refresh in flight at a time. Whoever was queued behind it
        // re-checks freshness first so a single fetch serves all waiters.
        let _gate = self.refresh_gate.lock();
        if !force_refresh {
            if let Some(index) = self.fresh() {
                return Some(index);
            }
        }

        match self.fetcher.fetch(&self.url) {
            Ok(index) => {
                let index = Arc::new(index);
                *self.current.write() = Some(CachedIndex {
                    index: Arc::clone(&index),
                    expires_at: Instant::now() + self.ttl,
                });
                debug!(entries = index.len(), "resource index cache refreshed");
                Some(index)
            }
            Err(e) => {
                warn!(url = %self.url, err = %e, "resource index refresh failed");
                if force_refresh {
                    None
                } else {
                    // Stale-read fallback: a previous index, even an expired
                    // one, beats no index at all.
                    self.current.read().as_ref().map(|c| Arc::clone(&c.index))
                }
            }
        }
    }

    fn fresh(&self) -> Option<Arc<ResourceIndex>> {
        let guard = self.current.read();
        guard
            .as_ref()
            .filter(|c| Instant::now() <= c.expires_at)
            .map(|c| Arc::clone(&c.index))
    }
}
