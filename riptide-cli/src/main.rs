//! Riptide CLI - manifest-driven game asset installer.
//!
//! This binary wraps the riptide library's installer pipeline with a
//! terminal interface: progress bars for run-style commands and plain
//! output for queries.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use console::style;
use riptide::InstallMode;
use tracing_subscriber::EnvFilter;

use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "riptide", version, about = "Manifest-driven game asset installer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter, e.g. "riptide=debug" (RUST_LOG also honored)
    #[arg(long, global = true)]
    log: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Install missing or changed files and promote them into place
    Install(commands::run::RunArgs),
    /// Update an existing install, touching only changed files
    Update(commands::run::RunArgs),
    /// Pre-download files into staging without promoting them
    Preload(commands::run::RunArgs),
    /// Show the installed version and on-disk coverage
    Status(commands::status::StatusArgs),
    /// Remove an installed tree
    Uninstall(commands::uninstall::UninstallArgs),
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn dispatch(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Install(args) => commands::run::run(args, InstallMode::Install),
        Commands::Update(args) => commands::run::run(args, InstallMode::Update),
        Commands::Preload(args) => commands::run::run(args, InstallMode::Preload),
        Commands::Status(args) => commands::status::run(args),
        Commands::Uninstall(args) => commands::uninstall::run(args),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    if let Err(e) = dispatch(cli.command) {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}
