//! Riptide - manifest-driven game asset installer.
//!
//! This library implements the resource-index pipeline used to install and
//! update a game's on-disk assets:
//!
//! 1. Fetch a versioned manifest of remote files (`manifest`)
//! 2. Diff it against local disk state to build a download plan
//! 3. Download missing/changed content concurrently into a staging directory
//! 4. Verify sizes and checksums of the staged files
//! 5. Atomically promote verified files into the final install layout
//!
//! Progress is reported through immutable [`InstallProgress`] snapshots built
//! from lock-free atomic counters, and every phase observes a shared
//! [`CancelToken`].

pub mod cancel;
pub mod config;
pub mod http;
pub mod installer;
pub mod manifest;
pub mod receipt;

pub use cancel::CancelToken;
pub use config::InstallerConfig;
pub use installer::progress::{InstallProgress, Phase, ProgressCallback};
pub use installer::{InstallMode, InstallOutcome, Installer, InstallerError};
pub use manifest::{ChunkRange, ResourceEntry, ResourceIndex};
pub use receipt::InstallReceipt;
