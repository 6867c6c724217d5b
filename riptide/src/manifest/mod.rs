//! Resource index (manifest) types and retrieval.
//!
//! The remote manifest describes every installable asset: its relative
//! destination path, size, checksum and optional byte-range chunks. This
//! module provides:
//! - The typed manifest model ([`ResourceIndex`], [`ResourceEntry`],
//!   [`ChunkRange`])
//! - Tolerant JSON decoding (`decode`)
//! - Fetching over HTTP (`fetch`)
//! - A TTL cache with stale-read-on-error fallback (`cache`)

mod decode;
mod fetch;

pub mod cache;

pub use cache::IndexCache;
pub use decode::decode_index;
pub use fetch::{IndexFetcher, ManifestError};

/// A contiguous byte range of a remote file, fetched via an HTTP range
/// request.
///
/// `end` is inclusive. Chunk order within an entry is significant: chunks are
/// requested and appended in sequence order to reconstruct the original byte
/// stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRange {
    /// First byte offset of the range.
    pub start: u64,
    /// Last byte offset of the range (inclusive).
    pub end: u64,
    /// Optional per-chunk MD5 checksum (lowercase-insensitive hex).
    pub checksum: Option<String>,
}

/// One installable asset described by the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Relative destination path, forward-slash separated.
    pub dest: String,
    /// MD5 checksum of the whole file (lowercase-insensitive hex), if known.
    pub checksum: Option<String>,
    /// Expected file size in bytes; 0 when unknown.
    pub size: u64,
    /// Byte-range chunks, in request order. Empty means whole-file download.
    pub chunks: Vec<ChunkRange>,
}

impl ResourceEntry {
    /// Whether this entry is downloaded via ranged chunk requests.
    pub fn is_chunked(&self) -> bool {
        !self.chunks.is_empty()
    }
}

/// An immutable snapshot of the remote manifest.
///
/// Created by the fetcher on every successful fetch and superseded, never
/// mutated, by the next one. Entries with empty or whitespace destination
/// paths are dropped at decode time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIndex {
    /// Manifest entries in wire order.
    pub entries: Vec<ResourceEntry>,
}

impl ResourceIndex {
    /// Whether the index contains no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Saturating sum of all entry sizes.
    pub fn total_size(&self) -> u64 {
        self.entries
            .iter()
            .fold(0u64, |acc, e| acc.saturating_add(e.size))
    }
}
