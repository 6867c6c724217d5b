//! Local state scanning: diffing the manifest against the install directory.
//!
//! For each manifest entry the scanner decides whether the installed file
//! already satisfies it. An equal file length is accepted as sufficient when
//! the manifest carries a size - a deliberate performance trade-off, not a
//! strict integrity guarantee. Checksums are only computed when the size is
//! unknown, and never for files above the configured threshold.

use std::path::Path;

use tracing::{debug, warn};

use crate::cancel::{CancelToken, Cancelled};
use crate::manifest::{ResourceEntry, ResourceIndex};

use super::checksum::{checksum_matches, file_md5_hex};
use super::InstallMode;

/// What to do with one manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    /// The installed file already satisfies the entry.
    Skip,
    /// The entry must be fetched.
    Download,
}

/// One manifest entry paired with its normalized relative path and decision.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    /// Slash-normalized path relative to the install root.
    pub rel_path: String,
    /// The manifest entry.
    pub entry: ResourceEntry,
    /// Scan decision.
    pub action: PlanAction,
}

/// The download plan for one installer run.
///
/// Computed once per run and consumed by the fetch engine; never persisted.
#[derive(Debug, Default)]
pub struct DownloadPlan {
    /// Planned entries, in manifest order.
    pub entries: Vec<PlanEntry>,
    /// Entries already satisfied on disk before the run.
    pub already_satisfied: usize,
}

impl DownloadPlan {
    /// Entries that need downloading.
    pub fn downloads(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries
            .iter()
            .filter(|e| e.action == PlanAction::Download)
    }

    /// Number of entries that need downloading.
    pub fn download_count(&self) -> usize {
        self.downloads().count()
    }

    /// Total bytes across entries that need downloading (saturating).
    pub fn bytes_to_download(&self) -> u64 {
        self.downloads()
            .fold(0u64, |acc, e| acc.saturating_add(e.entry.size))
    }
}

/// Scan the install directory and build a [`DownloadPlan`].
///
/// In [`InstallMode::Update`] satisfied entries are excluded from the plan
/// entirely; in install/preload modes they stay in the plan as `Skip` so
/// they still seed the progress counters.
pub fn scan(
    index: &ResourceIndex,
    install_root: &Path,
    mode: InstallMode,
    checksum_threshold: u64,
    cancel: &CancelToken,
) -> Result<DownloadPlan, Cancelled> {
    let mut plan = DownloadPlan::default();

    for entry in &index.entries {
        cancel.check()?;

        let Some(rel_path) = normalize_rel_path(&entry.dest) else {
            continue;
        };

        let final_path = install_root.join(&rel_path);
        let satisfied = entry_satisfied(entry, &final_path, checksum_threshold);

        if satisfied {
            plan.already_satisfied += 1;
            if mode == InstallMode::Update {
                // Skip-unchanged policy: updates only touch changed files.
                continue;
            }
            plan.entries.push(PlanEntry {
                rel_path,
                entry: entry.clone(),
                action: PlanAction::Skip,
            });
        } else {
            plan.entries.push(PlanEntry {
                rel_path,
                entry: entry.clone(),
                action: PlanAction::Download,
            });
        }
    }

    debug!(
        mode = ?mode,
        downloads = plan.download_count(),
        satisfied = plan.already_satisfied,
        "download plan computed"
    );
    Ok(plan)
}

/// Check whether the file at `path` satisfies the manifest entry.
fn entry_satisfied(entry: &ResourceEntry, path: &Path, checksum_threshold: u64) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    let len = metadata.len();

    // Cheap size check first; equal length is treated as sufficient.
    if entry.size > 0 {
        return len == entry.size;
    }

    // Size unknown: fall back to the checksum when one exists and the file
    // is small enough to hash.
    if let Some(expected) = &entry.checksum {
        if len <= checksum_threshold {
            return match file_md5_hex(path) {
                Ok(actual) => checksum_matches(&actual, expected),
                Err(e) => {
                    warn!(path = %path.display(), err = %e, "failed to checksum existing file");
                    false
                }
            };
        }
    }

    // No way to validate cheaply; conservatively re-download.
    false
}

/// Normalize a manifest `dest` into a relative slash path.
///
/// Backslashes are folded to forward slashes and leading separators are
/// stripped. Returns `None` when nothing remains.
pub fn normalize_rel_path(dest: &str) -> Option<String> {
    let normalized = dest.replace('\\', "/");
    let trimmed = normalized.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const THRESHOLD: u64 = 50 * 1024 * 1024;

    fn entry(dest: &str, size: u64, checksum: Option<&str>) -> ResourceEntry {
        ResourceEntry {
            dest: dest.to_string(),
            checksum: checksum.map(str::to_string),
            size,
            chunks: Vec::new(),
        }
    }

    fn index_of(entries: Vec<ResourceEntry>) -> ResourceIndex {
        ResourceIndex { entries }
    }

    #[test]
    fn test_missing_file_is_planned_for_download() {
        let temp = TempDir::new().unwrap();
        let index = index_of(vec![entry("a/b.bin", 100, Some("deadbeef"))]);

        let plan = scan(
            &index,
            temp.path(),
            InstallMode::Install,
            THRESHOLD,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(plan.download_count(), 1);
        assert_eq!(plan.already_satisfied, 0);
        assert_eq!(plan.entries[0].rel_path, "a/b.bin");
    }

    #[test]
    fn test_matching_size_satisfies_without_checksum() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a")).unwrap();
        fs::write(temp.path().join("a/b.bin"), vec![0u8; 100]).unwrap();

        // Checksum deliberately wrong: it must not be consulted when the
        // size matches.
        let index = index_of(vec![entry("a/b.bin", 100, Some("not-a-real-md5"))]);

        let plan = scan(
            &index,
            temp.path(),
            InstallMode::Install,
            THRESHOLD,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(plan.download_count(), 0);
        assert_eq!(plan.already_satisfied, 1);
        assert_eq!(plan.entries[0].action, PlanAction::Skip);
    }

    #[test]
    fn test_size_mismatch_forces_download() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a")).unwrap();
        fs::write(temp.path().join("a/b.bin"), vec![0u8; 99]).unwrap();

        let index = index_of(vec![entry("a/b.bin", 100, Some("deadbeef"))]);

        for mode in [InstallMode::Install, InstallMode::Update, InstallMode::Preload] {
            let plan = scan(&index, temp.path(), mode, THRESHOLD, &CancelToken::new()).unwrap();
            assert_eq!(plan.download_count(), 1, "mode {:?}", mode);
        }
    }

    #[test]
    fn test_zero_size_entry_uses_checksum() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("f.bin"), b"hello world").unwrap();

        // MD5 of "hello world", uppercase to exercise case-insensitivity.
        let good = index_of(vec![entry(
            "f.bin",
            0,
            Some("5EB63BBBE01EEED093CB22BB8F5ACDC3"),
        )]);
        let plan = scan(
            &good,
            temp.path(),
            InstallMode::Update,
            THRESHOLD,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(plan.download_count(), 0);
        assert_eq!(plan.already_satisfied, 1);

        let bad = index_of(vec![entry("f.bin", 0, Some("00000000"))]);
        let plan = scan(
            &bad,
            temp.path(),
            InstallMode::Update,
            THRESHOLD,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(plan.download_count(), 1);
    }

    #[test]
    fn test_zero_size_above_threshold_redownloads() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("f.bin"), b"hello world").unwrap();

        // Threshold below the file length: checksum is skipped and the
        // entry is conservatively re-downloaded.
        let index = index_of(vec![entry("f.bin", 0, Some("5eb63bbbe01eeed093cb22bb8f5acdc3"))]);
        let plan = scan(&index, temp.path(), InstallMode::Install, 4, &CancelToken::new()).unwrap();
        assert_eq!(plan.download_count(), 1);
    }

    #[test]
    fn test_update_mode_excludes_satisfied_entries() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("ok.bin"), vec![1u8; 10]).unwrap();

        let index = index_of(vec![
            entry("ok.bin", 10, None),
            entry("missing.bin", 20, None),
        ]);

        let plan = scan(
            &index,
            temp.path(),
            InstallMode::Update,
            THRESHOLD,
            &CancelToken::new(),
        )
        .unwrap();

        // Satisfied entry is excluded entirely, not marked Skip.
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].rel_path, "missing.bin");
        assert_eq!(plan.already_satisfied, 1);
    }

    #[test]
    fn test_install_mode_keeps_satisfied_as_skip() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("ok.bin"), vec![1u8; 10]).unwrap();

        let index = index_of(vec![
            entry("ok.bin", 10, None),
            entry("missing.bin", 20, None),
        ]);

        let plan = scan(
            &index,
            temp.path(),
            InstallMode::Install,
            THRESHOLD,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[0].action, PlanAction::Skip);
        assert_eq!(plan.entries[1].action, PlanAction::Download);
        assert_eq!(plan.bytes_to_download(), 20);
    }

    #[test]
    fn test_cancel_aborts_scan() {
        let temp = TempDir::new().unwrap();
        let index = index_of(vec![entry("a.bin", 1, None)]);
        let cancel = CancelToken::new();
        cancel.cancel();

        assert!(scan(&index, temp.path(), InstallMode::Install, THRESHOLD, &cancel).is_err());
    }

    #[test]
    fn test_normalize_rel_path() {
        assert_eq!(normalize_rel_path("a/b.bin").as_deref(), Some("a/b.bin"));
        assert_eq!(normalize_rel_path("/a/b.bin").as_deref(), Some("a/b.bin"));
        assert_eq!(normalize_rel_path("a\\b.bin").as_deref(), Some("a/b.bin"));
        assert_eq!(normalize_rel_path("   "), None);
        assert_eq!(normalize_rel_path("//"), None);
    }
}
