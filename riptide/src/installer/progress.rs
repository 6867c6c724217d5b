//! Progress aggregation for installer runs.
//!
//! Workers on every thread bump shared atomic counters; snapshots are
//! assembled field-by-field from atomic reads. A snapshot is consistent per
//! field, not transactionally across fields, which is sufficient for
//! observer display.
//!
//! Emission is de-duplicated: the external callback only fires when the
//! file-completed counter moved or the phase changed, so byte-level updates
//! cannot flood the observer with identical snapshots.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Installer run phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Building the download plan.
    Preparing = 0,
    /// Fetching entries into the staging directory.
    Download = 1,
    /// Validating staged files.
    Verify = 2,
    /// Promoting staged files into the install layout.
    Install = 3,
    /// Run finished.
    Completed = 4,
}

impl Phase {
    /// Human-readable phase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Preparing => "Preparing",
            Self::Download => "Downloading",
            Self::Verify => "Verifying",
            Self::Install => "Installing",
            Self::Completed => "Completed",
        }
    }
}

/// Immutable progress snapshot handed to observers.
///
/// Each emission is a fresh value; no shared mutable state escapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallProgress {
    /// Current phase.
    pub phase: Phase,
    /// Files completed within the current phase.
    pub files_completed: u64,
    /// Total files the current run operates on.
    pub files_total: u64,
    /// Bytes completed within the current phase.
    pub bytes_completed: u64,
    /// Total bytes the current run will transfer.
    pub bytes_total: u64,
}

/// Observer callback invoked with progress snapshots.
pub type ProgressCallback = Box<dyn Fn(InstallProgress) + Send + Sync>;

/// Shared atomic counter block mutated by worker threads.
///
/// Passed by `Arc` into the worker pool; never a static.
#[derive(Debug, Default)]
pub struct ProgressCounters {
    files_completed: AtomicU64,
    files_total: AtomicU64,
    bytes_completed: AtomicU64,
    bytes_total: AtomicU64,
}

impl ProgressCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the run totals.
    pub fn set_totals(&self, files: u64, bytes: u64) {
        self.files_total.store(files, Ordering::SeqCst);
        self.bytes_total.store(bytes, Ordering::SeqCst);
    }

    /// Seed completed counters (already-satisfied entries, resumed bytes).
    pub fn seed_completed(&self, files: u64, bytes: u64) {
        self.files_completed.store(files, Ordering::SeqCst);
        self.bytes_completed.store(bytes, Ordering::SeqCst);
    }

    /// Reset completed counters at a phase boundary.
    pub fn reset_completed(&self) {
        self.files_completed.store(0, Ordering::SeqCst);
        self.bytes_completed.store(0, Ordering::SeqCst);
    }

    /// Record transferred/verified bytes.
    pub fn add_bytes(&self, delta: u64) {
        if delta > 0 {
            self.bytes_completed.fetch_add(delta, Ordering::SeqCst);
        }
    }

    /// Record one completed file.
    pub fn file_done(&self) {
        self.files_completed.fetch_add(1, Ordering::SeqCst);
    }

    /// Clamp completed bytes to the total when retries overshoot.
    pub fn clamp_bytes(&self) {
        let total = self.bytes_total.load(Ordering::SeqCst);
        if total > 0 && self.bytes_completed.load(Ordering::SeqCst) > total {
            self.bytes_completed.store(total, Ordering::SeqCst);
        }
    }

    /// Completed files count.
    pub fn files_completed(&self) -> u64 {
        self.files_completed.load(Ordering::SeqCst)
    }

    /// Completed bytes count.
    pub fn bytes_completed(&self) -> u64 {
        self.bytes_completed.load(Ordering::SeqCst)
    }

    /// Assemble a snapshot for the given phase.
    pub fn snapshot(&self, phase: Phase) -> InstallProgress {
        InstallProgress {
            phase,
            files_completed: self.files_completed.load(Ordering::SeqCst),
            files_total: self.files_total.load(Ordering::SeqCst),
            bytes_completed: self.bytes_completed.load(Ordering::SeqCst),
            bytes_total: self.bytes_total.load(Ordering::SeqCst),
        }
    }
}

/// Sentinel meaning "nothing emitted yet".
const NEVER_EMITTED: u64 = u64::MAX;

/// De-duplicating snapshot emitter.
pub struct ProgressReporter {
    counters: Arc<ProgressCounters>,
    callback: Option<ProgressCallback>,
    last_files: AtomicU64,
    last_phase: AtomicU8,
}

impl ProgressReporter {
    /// Create a reporter over the shared counters.
    pub fn new(counters: Arc<ProgressCounters>, callback: Option<ProgressCallback>) -> Self {
        Self {
            counters,
            callback,
            last_files: AtomicU64::new(NEVER_EMITTED),
            last_phase: AtomicU8::new(u8::MAX),
        }
    }

    /// The shared counter block.
    pub fn counters(&self) -> &Arc<ProgressCounters> {
        &self.counters
    }

    /// Emit a snapshot if the file counter or phase changed since the last
    /// emission.
    pub fn report(&self, phase: Phase) {
        let snapshot = self.counters.snapshot(phase);

        let prev_files = self
            .last_files
            .swap(snapshot.files_completed, Ordering::SeqCst);
        let prev_phase = self.last_phase.swap(phase as u8, Ordering::SeqCst);

        if prev_files == snapshot.files_completed && prev_phase == phase as u8 {
            return;
        }

        if let Some(ref cb) = self.callback {
            cb(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[test]
    fn test_counters_accumulate() {
        let counters = ProgressCounters::new();
        counters.set_totals(3, 300);
        counters.add_bytes(100);
        counters.add_bytes(50);
        counters.file_done();

        let snap = counters.snapshot(Phase::Download);
        assert_eq!(snap.files_completed, 1);
        assert_eq!(snap.files_total, 3);
        assert_eq!(snap.bytes_completed, 150);
        assert_eq!(snap.bytes_total, 300);
    }

    #[test]
    fn test_reset_clears_completed_not_totals() {
        let counters = ProgressCounters::new();
        counters.set_totals(3, 300);
        counters.seed_completed(2, 200);
        counters.reset_completed();

        let snap = counters.snapshot(Phase::Verify);
        assert_eq!(snap.files_completed, 0);
        assert_eq!(snap.bytes_completed, 0);
        assert_eq!(snap.files_total, 3);
        assert_eq!(snap.bytes_total, 300);
    }

    #[test]
    fn test_clamp_bytes() {
        let counters = ProgressCounters::new();
        counters.set_totals(1, 100);
        counters.add_bytes(250);
        counters.clamp_bytes();
        assert_eq!(counters.bytes_completed(), 100);
    }

    #[test]
    fn test_clamp_noop_when_total_unknown() {
        let counters = ProgressCounters::new();
        counters.add_bytes(250);
        counters.clamp_bytes();
        assert_eq!(counters.bytes_completed(), 250);
    }

    #[test]
    fn test_reporter_dedupes_identical_snapshots() {
        let counters = Arc::new(ProgressCounters::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let reporter = ProgressReporter::new(
            Arc::clone(&counters),
            Some(Box::new(move |_| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })),
        );

        reporter.report(Phase::Download);
        reporter.report(Phase::Download);
        reporter.report(Phase::Download);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        counters.file_done();
        reporter.report(Phase::Download);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reporter_emits_on_phase_change() {
        let counters = Arc::new(ProgressCounters::new());
        let phases = Arc::new(Mutex::new(Vec::new()));
        let phases_clone = Arc::clone(&phases);

        let reporter = ProgressReporter::new(
            counters,
            Some(Box::new(move |p: InstallProgress| {
                phases_clone.lock().unwrap().push(p.phase);
            })),
        );

        reporter.report(Phase::Preparing);
        reporter.report(Phase::Download);
        reporter.report(Phase::Download);
        reporter.report(Phase::Verify);

        assert_eq!(
            *phases.lock().unwrap(),
            vec![Phase::Preparing, Phase::Download, Phase::Verify]
        );
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Preparing.name(), "Preparing");
        assert_eq!(Phase::Download.name(), "Downloading");
        assert_eq!(Phase::Verify.name(), "Verifying");
        assert_eq!(Phase::Install.name(), "Installing");
        assert_eq!(Phase::Completed.name(), "Completed");
    }
}
