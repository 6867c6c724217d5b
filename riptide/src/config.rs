//! Configuration for the installer.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Files at or below this size are checksummed; larger files rely on the
/// size comparison alone (50 MiB).
pub const CHECKSUM_SIZE_THRESHOLD: u64 = 50 * 1024 * 1024;

/// How long a fetched resource index stays fresh (10 minutes).
pub const INDEX_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Staging directory relative to the install root.
pub const STAGING_SUBDIR: &str = "TempPath/TempGameFiles";

/// Configuration for an [`Installer`](crate::Installer) run.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Directory the game is installed into.
    pub install_root: PathBuf,

    /// URL of the resource index (manifest) JSON document.
    pub manifest_url: String,

    /// Base URL that entry `dest` paths are resolved against.
    pub asset_base_url: String,

    /// Game version string written to the install receipt.
    ///
    /// Supplied by the host from its launcher API response.
    pub version: String,

    /// Install-type tag written to the install receipt.
    pub install_type: String,

    /// Worker pool size for download/verify phases.
    ///
    /// `0` means use the machine's available parallelism.
    pub concurrency: usize,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Maximum file size for which checksums are computed.
    pub checksum_threshold: u64,

    /// Resource index cache time-to-live.
    pub cache_ttl: Duration,

    /// When true, a run that ends with files still missing after the retry
    /// pass fails with `InstallerError::Incomplete` instead of completing
    /// silently.
    pub strict_completion: bool,
}

impl InstallerConfig {
    /// Create a configuration with default tuning parameters.
    pub fn new(
        install_root: impl Into<PathBuf>,
        manifest_url: impl Into<String>,
        asset_base_url: impl Into<String>,
    ) -> Self {
        Self {
            install_root: install_root.into(),
            manifest_url: manifest_url.into(),
            asset_base_url: asset_base_url.into(),
            version: String::new(),
            install_type: "unknown".to_string(),
            concurrency: 0,
            timeout: Duration::from_secs(300),
            checksum_threshold: CHECKSUM_SIZE_THRESHOLD,
            cache_ttl: INDEX_CACHE_TTL,
            strict_completion: false,
        }
    }

    /// Set the version string written to the install receipt.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the install-type tag written to the install receipt.
    pub fn with_install_type(mut self, install_type: impl Into<String>) -> Self {
        self.install_type = install_type.into();
        self
    }

    /// Set the worker pool size (0 = available parallelism).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the index cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Enable or disable strict completion.
    pub fn with_strict_completion(mut self, strict: bool) -> Self {
        self.strict_completion = strict;
        self
    }

    /// Effective worker pool size: configured value, or the machine's
    /// available parallelism, never less than 1.
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency > 0 {
            self.concurrency
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Staging directory for in-progress downloads.
    pub fn staging_dir(&self) -> PathBuf {
        self.install_root.join(STAGING_SUBDIR)
    }

    /// The install root as a path.
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }
}
