//! The status command.

use std::path::PathBuf;

use clap::Args;
use indicatif::HumanBytes;
use riptide::{Installer, InstallerConfig};

use crate::error::CliError;

/// Arguments for the status command.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Directory the game is installed into
    #[arg(long)]
    pub root: PathBuf,

    /// URL of the resource index JSON
    #[arg(long)]
    pub manifest_url: String,

    /// Base URL that asset paths are resolved against
    #[arg(long)]
    pub base_url: String,
}

/// Print the installed version and on-disk coverage of the manifest.
pub fn run(args: StatusArgs) -> Result<(), CliError> {
    let config = InstallerConfig::new(args.root, args.manifest_url, args.base_url);
    let installer = Installer::new(config)?;

    match installer.installed_version()? {
        Some(version) => println!("Installed version: {}", version),
        None => println!("Installed version: none (no install receipt)"),
    }

    match installer.total_size() {
        Some(total) => {
            println!("Manifest size:     {}", HumanBytes(total));
            if let Some(downloaded) = installer.downloaded_bytes() {
                println!("On disk:           {}", HumanBytes(downloaded));
            }
        }
        None => println!("Manifest size:     unavailable (index fetch failed)"),
    }

    Ok(())
}
