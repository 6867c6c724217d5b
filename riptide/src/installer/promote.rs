//! Promotion of verified staged files into the install layout.
//!
//! Runs sequentially: promotion is rename-bound, not bandwidth-bound, and a
//! deterministic order keeps partially promoted trees easy to reason about.
//! Each file is moved with delete-then-rename so a stale copy never
//! shadows the new one.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::cancel::{CancelToken, Cancelled};

use super::progress::{Phase, ProgressReporter};
use super::scanner::PlanEntry;

/// Move verified staged files into `install_root`.
///
/// Entries whose staged file is absent are skipped with a warning; rename
/// failures are logged and promotion continues, leaving the staged copy in
/// place for the next run. Returns the number of files promoted.
pub(super) fn promote_staged(
    entries: &[&PlanEntry],
    staging_dir: &Path,
    install_root: &Path,
    reporter: &ProgressReporter,
    cancel: &CancelToken,
) -> Result<usize, Cancelled> {
    let mut promoted = 0;

    for planned in entries {
        cancel.check()?;

        let staged = staging_dir.join(&planned.rel_path);
        if !staged.is_file() {
            warn!(dest = %planned.rel_path, "staged file missing at promotion");
            continue;
        }

        let final_path = install_root.join(&planned.rel_path);
        match promote_one(&staged, &final_path) {
            Ok(len) => {
                promoted += 1;
                reporter.counters().add_bytes(len);
                reporter.counters().file_done();
                reporter.report(Phase::Install);
            }
            Err(e) => {
                warn!(dest = %planned.rel_path, err = %e, "promotion failed, staged copy kept");
            }
        }
    }

    Ok(promoted)
}

fn promote_one(staged: &Path, final_path: &Path) -> std::io::Result<u64> {
    let len = staged.metadata()?.len();
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent)?;
    }
    if final_path.exists() {
        fs::remove_file(final_path)?;
    }
    fs::rename(staged, final_path)?;
    debug!(path = %final_path.display(), "file promoted");
    Ok(len)
}

/// Best-effort removal of the staging directory after a clean run.
pub(super) fn clean_staging(staging_dir: &Path) {
    if !staging_dir.exists() {
        return;
    }
    match fs::remove_dir_all(staging_dir) {
        Ok(()) => info!(path = %staging_dir.display(), "staging directory removed"),
        Err(e) => warn!(path = %staging_dir.display(), err = %e, "failed to remove staging directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::progress::ProgressCounters;
    use crate::installer::scanner::PlanAction;
    use crate::manifest::ResourceEntry;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn planned(dest: &str) -> PlanEntry {
        PlanEntry {
            rel_path: dest.to_string(),
            entry: ResourceEntry {
                dest: dest.to_string(),
                checksum: None,
                size: 0,
                chunks: Vec::new(),
            },
            action: PlanAction::Download,
        }
    }

    fn reporter() -> ProgressReporter {
        ProgressReporter::new(Arc::new(ProgressCounters::new()), None)
    }

    #[test]
    fn test_staged_file_moves_into_install_root() {
        let staging = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        fs::create_dir_all(staging.path().join("data")).unwrap();
        fs::write(staging.path().join("data/a.bin"), b"bytes").unwrap();
        let entry = planned("data/a.bin");
        let reporter = reporter();

        let promoted = promote_staged(
            &[&entry],
            staging.path(),
            root.path(),
            &reporter,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(promoted, 1);
        assert_eq!(fs::read(root.path().join("data/a.bin")).unwrap(), b"bytes");
        assert!(!staging.path().join("data/a.bin").exists());
        assert_eq!(reporter.counters().bytes_completed(), 5);
    }

    #[test]
    fn test_existing_final_file_is_replaced() {
        let staging = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        fs::write(staging.path().join("a.bin"), b"new").unwrap();
        fs::write(root.path().join("a.bin"), b"old-old-old").unwrap();
        let entry = planned("a.bin");
        let reporter = reporter();

        promote_staged(
            &[&entry],
            staging.path(),
            root.path(),
            &reporter,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(fs::read(root.path().join("a.bin")).unwrap(), b"new");
    }

    #[test]
    fn test_missing_staged_file_is_skipped() {
        let staging = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let entry = planned("gone.bin");
        let reporter = reporter();

        let promoted = promote_staged(
            &[&entry],
            staging.path(),
            root.path(),
            &reporter,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(promoted, 0);
        assert!(!root.path().join("gone.bin").exists());
    }

    #[test]
    fn test_cancel_aborts_promotion() {
        let staging = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        fs::write(staging.path().join("a.bin"), b"x").unwrap();
        let entry = planned("a.bin");
        let reporter = reporter();
        let cancel = CancelToken::new();
        cancel.cancel();

        assert!(promote_staged(&[&entry], staging.path(), root.path(), &reporter, &cancel).is_err());
    }

    #[test]
    fn test_clean_staging_removes_tree() {
        let staging = TempDir::new().unwrap();
        let dir = staging.path().join("nested");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("leftover.tmp"), b"x").unwrap();

        clean_staging(staging.path());

        assert!(!staging.path().exists());
    }
}
