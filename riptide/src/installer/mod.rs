//! Installer orchestration.
//!
//! An [`Installer`] run walks a fixed five-phase pipeline: plan, download,
//! verify, retry, promote. Entry failures are isolated per file and retried
//! once; the run itself only aborts for fatal conditions (no usable index,
//! unset install path, cancellation).

use std::fs;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::config::InstallerConfig;
use crate::http::{HttpClient, ReqwestClient};
use crate::manifest::{IndexCache, IndexFetcher, ResourceIndex};
use crate::receipt::InstallReceipt;

mod checksum;
mod engine;
mod error;
pub mod progress;
mod promote;
mod scanner;
mod urls;
mod verify;

pub use error::{InstallerError, InstallerResult};

use engine::{tmp_path, FetchEngine};
use progress::{Phase, ProgressCallback, ProgressCounters, ProgressReporter};
use scanner::{normalize_rel_path, PlanEntry};

/// What kind of run to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// Fresh install; satisfied files count toward progress.
    Install,
    /// Update in place; satisfied files are left untouched and excluded
    /// from progress totals.
    Update,
    /// Pre-download into staging without promoting.
    Preload,
}

impl InstallMode {
    /// Human-readable mode name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Preload => "preload",
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    /// Mode the run was started with.
    pub mode: InstallMode,
    /// Entries the plan operated on (downloads plus satisfied entries).
    pub files_total: u64,
    /// Bytes the download phase was asked to transfer.
    pub bytes_total: u64,
    /// Entries already satisfied before the run.
    pub already_satisfied: usize,
    /// Entries downloaded and verified this run.
    pub downloaded: usize,
    /// Entries promoted into the install layout.
    pub promoted: usize,
    /// Relative paths that could not be recovered by the retry pass.
    pub failed: Vec<String>,
}

impl InstallOutcome {
    /// Whether every planned entry ended up satisfied.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Manifest-driven asset installer.
pub struct Installer {
    config: InstallerConfig,
    http: Arc<dyn HttpClient>,
    cache: IndexCache,
}

impl Installer {
    /// Create an installer with a real HTTP client.
    pub fn new(config: InstallerConfig) -> InstallerResult<Self> {
        let http = ReqwestClient::new(config.timeout)
            .map_err(|e| InstallerError::HttpClientInit(e.to_string()))?;
        Ok(Self::with_http_client(config, Arc::new(http)))
    }

    /// Create an installer over an existing HTTP client.
    pub fn with_http_client(config: InstallerConfig, http: Arc<dyn HttpClient>) -> Self {
        let cache = IndexCache::new(
            IndexFetcher::new(Arc::clone(&http)),
            config.manifest_url.clone(),
            config.cache_ttl,
        );
        Self {
            config,
            http,
            cache,
        }
    }

    /// The configuration this installer was built with.
    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Execute a full run in the given mode.
    pub fn run(
        &self,
        mode: InstallMode,
        cancel: &CancelToken,
        on_progress: Option<ProgressCallback>,
    ) -> InstallerResult<InstallOutcome> {
        if self.config.install_root.as_os_str().is_empty() {
            return Err(InstallerError::InstallPathUnset);
        }

        let reporter = ProgressReporter::new(Arc::new(ProgressCounters::new()), on_progress);
        reporter.report(Phase::Preparing);

        let index = self.usable_index().ok_or(InstallerError::EmptyIndex)?;
        cancel.check()?;

        let staging_dir = self.config.staging_dir();
        fs::create_dir_all(&staging_dir).map_err(|source| InstallerError::CreateDirFailed {
            path: staging_dir.clone(),
            source,
        })?;

        let plan = scanner::scan(
            &index,
            self.config.install_root(),
            mode,
            self.config.checksum_threshold,
            cancel,
        )?;
        let downloads: Vec<&PlanEntry> = plan.downloads().collect();

        // Update mode drops satisfied entries from the plan, so they do not
        // count toward progress totals either.
        let counted_satisfied = if mode == InstallMode::Update {
            0
        } else {
            plan.already_satisfied
        };
        let files_total = (downloads.len() + counted_satisfied) as u64;
        let bytes_total = plan.bytes_to_download();
        let counters = Arc::clone(reporter.counters());
        counters.set_totals(files_total, bytes_total);
        counters.seed_completed(
            counted_satisfied as u64,
            staged_bytes(&downloads, &staging_dir),
        );
        reporter.report(Phase::Preparing);
        info!(
            mode = mode.name(),
            downloads = downloads.len(),
            satisfied = plan.already_satisfied,
            bytes = bytes_total,
            "run planned"
        );

        let concurrency = self.config.effective_concurrency();
        let engine = FetchEngine {
            http: self.http.as_ref(),
            base_url: &self.config.asset_base_url,
            staging_dir: &staging_dir,
            concurrency,
            reporter: &reporter,
            cancel,
        };
        engine.run(&downloads);
        cancel.check()?;

        counters.reset_completed();
        reporter.report(Phase::Verify);
        let mut failed = verify::verify_staged(
            &downloads,
            &staging_dir,
            self.config.checksum_threshold,
            concurrency,
            &reporter,
            cancel,
        );
        cancel.check()?;

        // One retry pass for everything the first round lost.
        if !failed.is_empty() {
            let retries: Vec<&PlanEntry> = downloads
                .iter()
                .copied()
                .filter(|e| failed.contains(&e.rel_path))
                .collect();
            warn!(count = retries.len(), "retrying failed entries");
            engine.run(&retries);
            cancel.check()?;
            failed = verify::verify_staged(
                &retries,
                &staging_dir,
                self.config.checksum_threshold,
                concurrency,
                &reporter,
                cancel,
            );
            cancel.check()?;
        }

        let verified: Vec<&PlanEntry> = downloads
            .iter()
            .copied()
            .filter(|e| !failed.contains(&e.rel_path))
            .collect();

        let promoted = if mode == InstallMode::Preload {
            // Preload leaves verified files parked in staging.
            0
        } else {
            counters.reset_completed();
            reporter.report(Phase::Install);
            let promoted = promote::promote_staged(
                &verified,
                &staging_dir,
                self.config.install_root(),
                &reporter,
                cancel,
            )?;
            self.write_receipt();
            if failed.is_empty() {
                promote::clean_staging(&staging_dir);
            }
            promoted
        };

        let mut failed: Vec<String> = failed.into_iter().collect();
        failed.sort();

        if failed.is_empty() {
            // Complete run: the final snapshot shows full totals regardless
            // of how the phases split the counting.
            counters.seed_completed(files_total, bytes_total);
        }
        counters.clamp_bytes();
        reporter.report(Phase::Completed);

        if !failed.is_empty() {
            warn!(count = failed.len(), "run finished with failed entries");
            if self.config.strict_completion {
                return Err(InstallerError::Incomplete { failed });
            }
        }

        Ok(InstallOutcome {
            mode,
            files_total,
            bytes_total,
            already_satisfied: plan.already_satisfied,
            downloaded: verified.len(),
            promoted,
            failed,
        })
    }

    /// Total byte size of the current manifest, if one can be fetched.
    pub fn total_size(&self) -> Option<u64> {
        self.cache.get(false).map(|index| index.total_size())
    }

    /// Estimate of bytes already on disk for the current manifest.
    ///
    /// Counts the installed file's length, else a staged copy, else a
    /// partial `.tmp` download.
    pub fn downloaded_bytes(&self) -> Option<u64> {
        let index = self.cache.get(false)?;
        let staging_dir = self.config.staging_dir();
        let mut total = 0u64;
        for entry in &index.entries {
            let Some(rel) = normalize_rel_path(&entry.dest) else {
                continue;
            };
            let final_path = self.config.install_root().join(&rel);
            let staged = staging_dir.join(&rel);
            let len = file_len(&final_path)
                .or_else(|| file_len(&staged))
                .or_else(|| file_len(&tmp_path(&staged)))
                .unwrap_or(0);
            total = total.saturating_add(len);
        }
        Some(total)
    }

    /// Version recorded by the last successful promotion, if any.
    pub fn installed_version(&self) -> std::io::Result<Option<String>> {
        Ok(InstallReceipt::load(self.config.install_root())?
            .map(|receipt| receipt.version)
            .filter(|v| !v.is_empty()))
    }

    /// Whether the configured version is newer than the installed one.
    ///
    /// Falls back to string inequality when either side is not a semantic
    /// version. No receipt means an update (or install) is needed.
    pub fn update_available(&self) -> std::io::Result<bool> {
        let Some(installed) = self.installed_version()? else {
            return Ok(true);
        };
        let available = match (
            semver::Version::parse(&installed),
            semver::Version::parse(&self.config.version),
        ) {
            (Ok(have), Ok(want)) => want > have,
            _ => installed != self.config.version,
        };
        Ok(available)
    }

    /// Remove the installed tree.
    ///
    /// Deletes the install root recursively, but only when an install
    /// receipt marks the directory as ours. Returns whether anything was
    /// removed.
    pub fn uninstall(&self) -> std::io::Result<bool> {
        if self.config.install_root.as_os_str().is_empty() {
            return Ok(false);
        }
        if InstallReceipt::load(self.config.install_root())?.is_none() {
            return Ok(false);
        }
        fs::remove_dir_all(self.config.install_root())?;
        info!(path = %self.config.install_root.display(), "install removed");
        Ok(true)
    }

    /// A non-empty index, refreshing once if the cached one is empty.
    fn usable_index(&self) -> Option<Arc<ResourceIndex>> {
        match self.cache.get(false) {
            Some(index) if !index.is_empty() => Some(index),
            _ => self.cache.get(true).filter(|index| !index.is_empty()),
        }
    }

    fn write_receipt(&self) {
        let receipt = InstallReceipt {
            version: self.config.version.clone(),
            index_file: manifest_basename(&self.config.manifest_url),
            install_type: self.config.install_type.clone(),
        };
        if let Err(e) = receipt.save(self.config.install_root()) {
            warn!(err = %e, "failed to write install receipt");
        }
    }
}

/// Bytes already present in staging for the planned downloads, counting a
/// complete staged file's length, else a partial `.tmp` one.
fn staged_bytes(downloads: &[&PlanEntry], staging_dir: &std::path::Path) -> u64 {
    let mut total = 0u64;
    for planned in downloads {
        let staged = staging_dir.join(&planned.rel_path);
        let len = file_len(&staged)
            .or_else(|| file_len(&tmp_path(&staged)))
            .unwrap_or(0);
        total = total.saturating_add(len);
    }
    total
}

fn file_len(path: &std::path::Path) -> Option<u64> {
    path.metadata().ok().filter(|m| m.is_file()).map(|m| m.len())
}

/// Final path segment of the manifest URL, without query parameters.
fn manifest_basename(url: &str) -> String {
    let no_query = url.split(['?', '#']).next().unwrap_or(url);
    no_query
        .rsplit('/')
        .next()
        .unwrap_or(no_query)
        .to_string()
}
