//! foldersync: keep directory trees in step.
//!
//! # Usage
//!
//! ```text
//! foldersync sync <SOURCE> <TARGET> [--one-way] [--watch] [--interval SECS] [--exclude PATTERN]...
//! foldersync bulk <SOURCE_SKILLS> <TARGET> [--bidirectional] [--no-skip-symlinks] [--dry-run]
//! foldersync config show|init
//! ```
//!
//! Exit codes: `0` success, `1` invalid invocation, `2` finished with errors.

mod commands;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{bulk::BulkArgs, config::ConfigCommand, sync::SyncArgs, RunStatus};
use foldersync_core::settings;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "foldersync",
    version,
    about = "Mirror or reconcile directory trees by modification time",
    long_about = None,
)]
struct Cli {
    /// Log every copy and skip.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synchronize one source directory with one target directory.
    Sync(SyncArgs),

    /// Synchronize every unit directory under a source root.
    Bulk(BulkArgs),

    /// Show or create the settings file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    // Usage errors share exit code 1 with other invalid invocations.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    let level = match &cli.command {
        _ if cli.verbose => "debug",
        Commands::Sync(args) if args.watch => "info",
        _ => "warn",
    };
    foldersync_watch::init_tracing(level);

    match dispatch(cli) {
        Ok(RunStatus::Clean) => ExitCode::SUCCESS,
        Ok(RunStatus::Partial) => ExitCode::from(2),
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(1)
        }
    }
}

fn dispatch(cli: Cli) -> Result<RunStatus> {
    match cli.command {
        Commands::Config { command } => commands::config::run(command),
        Commands::Sync(args) => {
            let settings = settings::load().context("failed to load settings")?;
            args.run(&settings, cli.verbose)
        }
        Commands::Bulk(args) => {
            let settings = settings::load().context("failed to load settings")?;
            args.run(&settings)
        }
    }
}
