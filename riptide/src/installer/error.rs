//! Error types for the installer.

use std::io;
use std::path::PathBuf;

use crate::cancel::Cancelled;

/// Result type for installer operations.
pub type InstallerResult<T> = Result<T, InstallerError>;

/// Errors that abort an installer run.
///
/// Per-entry failures (network, integrity, filesystem) are isolated and
/// collected inside the run; only the conditions below are fatal to the run
/// as a whole.
#[derive(Debug)]
pub enum InstallerError {
    /// The install root path is unset or empty.
    InstallPathUnset,

    /// The resource index could not be obtained, or was empty even after a
    /// forced refresh.
    EmptyIndex,

    /// Failed to create a required directory.
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Failed to construct the HTTP client.
    HttpClientInit(String),

    /// The run was cancelled.
    Cancelled,

    /// Strict completion: entries were still missing after the retry pass.
    Incomplete { failed: Vec<String> },
}

impl std::fmt::Display for InstallerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InstallPathUnset => write!(f, "game install path isn't set"),
            Self::EmptyIndex => write!(f, "resource index is empty"),
            Self::CreateDirFailed { path, source } => {
                write!(
                    f,
                    "failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::HttpClientInit(reason) => {
                write!(f, "failed to create HTTP client: {}", reason)
            }
            Self::Cancelled => write!(f, "installation cancelled"),
            Self::Incomplete { failed } => {
                write!(
                    f,
                    "installation incomplete: {} entries failed ({})",
                    failed.len(),
                    failed.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for InstallerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateDirFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<Cancelled> for InstallerError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}
