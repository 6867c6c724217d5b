//! Staged file verification.
//!
//! After the download phase every entry that was planned for download is
//! re-checked in staging. A size mismatch fails the entry outright; on top
//! of that, any entry carrying a checksum is hashed and compared as long as
//! the file is under the hashing threshold. Files that fail are deleted so
//! a retry pass fetches them fresh.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use tracing::{debug, warn};

use crate::cancel::CancelToken;

use super::checksum::{checksum_matches, file_md5_hex};
use super::progress::{Phase, ProgressReporter};
use super::scanner::PlanEntry;

/// Validate staged files for the given entries with a worker pool.
///
/// Returns the relative paths that failed. Failed staged files are removed
/// from staging before returning.
pub(super) fn verify_staged(
    entries: &[&PlanEntry],
    staging_dir: &Path,
    checksum_threshold: u64,
    concurrency: usize,
    reporter: &ProgressReporter,
    cancel: &CancelToken,
) -> HashSet<String> {
    if entries.is_empty() {
        return HashSet::new();
    }

    let cursor = AtomicUsize::new(0);
    let failed = Mutex::new(HashSet::new());
    let workers = concurrency.max(1).min(entries.len());

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                if cancel.is_cancelled() {
                    break;
                }
                let idx = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(planned) = entries.get(idx) else {
                    break;
                };

                let staged = staging_dir.join(&planned.rel_path);
                match verify_one(planned, &staged, checksum_threshold) {
                    Ok(len) => {
                        reporter.counters().add_bytes(len);
                        reporter.counters().file_done();
                        reporter.report(Phase::Verify);
                    }
                    Err(reason) => {
                        warn!(dest = %planned.rel_path, reason = %reason, "verification failed");
                        if staged.exists() {
                            if let Err(e) = fs::remove_file(&staged) {
                                warn!(path = %staged.display(), err = %e, "failed to remove bad staged file");
                            }
                        }
                        if let Ok(mut guard) = failed.lock() {
                            guard.insert(planned.rel_path.clone());
                        }
                    }
                }
            });
        }
    });

    failed.into_inner().unwrap_or_default()
}

/// Check one staged file, returning its length on success and a reason on
/// failure.
fn verify_one(
    planned: &PlanEntry,
    staged: &Path,
    checksum_threshold: u64,
) -> Result<u64, String> {
    let metadata = staged
        .metadata()
        .map_err(|_| "missing from staging".to_string())?;
    if !metadata.is_file() {
        return Err("not a regular file".to_string());
    }
    let len = metadata.len();

    if planned.entry.size > 0 && len != planned.entry.size {
        return Err(format!(
            "size mismatch: expected {}, found {}",
            planned.entry.size, len
        ));
    }

    if let Some(expected) = &planned.entry.checksum {
        if len <= checksum_threshold {
            let actual =
                file_md5_hex(staged).map_err(|e| format!("checksum read failed: {}", e))?;
            if !checksum_matches(&actual, expected) {
                return Err(format!(
                    "checksum mismatch: expected {}, computed {}",
                    expected, actual
                ));
            }
            return Ok(len);
        }
    }

    if planned.entry.size == 0 && planned.entry.checksum.is_none() {
        debug!(dest = %planned.rel_path, "no size or checksum to verify against");
    }
    Ok(len)
}
