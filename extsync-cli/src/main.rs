//! extsync — keep installed content extensions and the content backend in step.
//!
//! # Usage
//!
//! ```text
//! extsync sync [--dry-run] [--fail-fast]
//! extsync plan [--json]
//! extsync status [--json]
//! extsync run [-- ARGS...]
//! ```
//!
//! Every command accepts `--config <path>` (or `EXTSYNC_CONFIG`).

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{plan::PlanArgs, run::RunArgs, status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "extsync",
    version,
    about = "Reconcile installed content extensions with the content backend",
    long_about = None,
)]
struct Cli {
    /// Config file (defaults to <config_dir>/extsync/config.yaml).
    #[arg(long, global = true, env = "EXTSYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one reconciliation pass.
    Sync(SyncArgs),

    /// Show the operations the next pass would run.
    Plan(PlanArgs),

    /// Show known extensions and whether a pass is running.
    Status(StatusArgs),

    /// Reconcile, then launch the backend with the given arguments.
    Run(RunArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Sync(args) => args.run(config),
        Commands::Plan(args) => args.run(config),
        Commands::Status(args) => args.run(config),
        Commands::Run(args) => args.run(config),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
