//! The install/update/preload commands.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use riptide::{CancelToken, InstallMode, Installer, InstallerConfig};

use crate::error::CliError;

/// Arguments shared by the run-style commands.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Directory the game is installed into
    #[arg(long)]
    pub root: PathBuf,

    /// URL of the resource index JSON
    #[arg(long)]
    pub manifest_url: String,

    /// Base URL that asset paths are resolved against
    #[arg(long)]
    pub base_url: String,

    /// Game version recorded in the install receipt
    #[arg(long, default_value = "")]
    pub game_version: String,

    /// Install-type tag recorded in the install receipt
    #[arg(long, default_value = "unknown")]
    pub install_type: String,

    /// Worker pool size (0 = number of CPUs)
    #[arg(long, default_value_t = 0)]
    pub concurrency: usize,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,

    /// Fail with a non-zero exit when files are still missing after retry
    #[arg(long)]
    pub strict: bool,
}

impl RunArgs {
    fn into_config(self) -> InstallerConfig {
        InstallerConfig::new(self.root, self.manifest_url, self.base_url)
            .with_version(self.game_version)
            .with_install_type(self.install_type)
            .with_concurrency(self.concurrency)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_strict_completion(self.strict)
    }
}

/// Execute one run in the given mode with a terminal progress bar.
pub fn run(args: RunArgs, mode: InstallMode) -> Result<(), CliError> {
    let installer = Installer::new(args.into_config())?;

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| CliError::Setup(format!("failed to install signal handler: {}", e)))?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes}",
        )
        .map_err(|e| CliError::Setup(format!("bad progress template: {}", e)))?
        .progress_chars("=>-"),
    );

    let progress_bar = bar.clone();
    let outcome = installer.run(
        mode,
        &cancel,
        Some(Box::new(move |p| {
            progress_bar.set_length(p.bytes_total);
            progress_bar.set_position(p.bytes_completed);
            progress_bar.set_message(format!(
                "{} {}/{}",
                p.phase.name(),
                p.files_completed,
                p.files_total
            ));
        })),
    )?;
    bar.finish_and_clear();

    println!(
        "{} {} complete: {} downloaded, {} already present, {} transferred",
        style("✓").green().bold(),
        outcome.mode.name(),
        outcome.downloaded,
        outcome.already_satisfied,
        HumanBytes(outcome.bytes_total)
    );
    if !outcome.failed.is_empty() {
        println!(
            "{} {} entries could not be fetched:",
            style("!").yellow().bold(),
            outcome.failed.len()
        );
        for path in &outcome.failed {
            println!("    {}", path);
        }
    }
    Ok(())
}
