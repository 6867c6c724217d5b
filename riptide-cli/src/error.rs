//! Error types for the CLI.

use std::io;

use riptide::installer::InstallerError;

/// Errors surfaced to the terminal with a non-zero exit code.
#[derive(Debug)]
pub enum CliError {
    /// An installer run failed.
    Installer(InstallerError),
    /// Filesystem access failed.
    Io(io::Error),
    /// The command could not be set up (bad arguments, signal handler).
    Setup(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installer(e) => write!(f, "{}", e),
            Self::Io(e) => write!(f, "{}", e),
            Self::Setup(reason) => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Installer(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Setup(_) => None,
        }
    }
}

impl From<InstallerError> for CliError {
    fn from(e: InstallerError) -> Self {
        Self::Installer(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_passes_through_inner_message() {
        let err: CliError = InstallerError::EmptyIndex.into();
        assert_eq!(err.to_string(), "resource index is empty");
    }
}
