//! The uninstall command.

use std::path::PathBuf;

use clap::Args;
use console::style;
use riptide::{Installer, InstallerConfig};

use crate::error::CliError;

/// Arguments for the uninstall command.
#[derive(Debug, Args)]
pub struct UninstallArgs {
    /// Directory the game is installed into
    #[arg(long)]
    pub root: PathBuf,

    /// Actually delete; without this flag the command only reports
    #[arg(long)]
    pub yes: bool,
}

/// Remove an installed tree, gated on an install receipt and `--yes`.
pub fn run(args: UninstallArgs) -> Result<(), CliError> {
    if !args.yes {
        println!(
            "Would remove {} and everything under it. Re-run with --yes to confirm.",
            args.root.display()
        );
        return Ok(());
    }

    let config = InstallerConfig::new(args.root.clone(), "", "");
    let installer = Installer::new(config)?;

    if installer.uninstall()? {
        println!("{} removed {}", style("✓").green().bold(), args.root.display());
    } else {
        println!(
            "Nothing removed: {} has no install receipt",
            args.root.display()
        );
    }
    Ok(())
}
