//! CLI command definitions and handlers

mod authority_cmd;
mod baseline;
mod cache_cmd;
mod check;

use crate::error::ExitCode;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Doxy - static API-compatibility verifier
///
/// Checks every imported symbol and call site against version-indexed API
/// specifications for the exact dependency versions the project has locked.
#[derive(Parser, Debug)]
#[command(name = "doxy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the project root (default: current directory)
    #[arg(global = true, default_value = ".")]
    pub path: PathBuf,

    /// Number of parallel workers (0 = auto)
    #[arg(long, global = true, default_value = "0")]
    pub workers: usize,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze the project for API compatibility issues
    Check {
        /// Output format: text, json, sarif
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json", "sarif"])]
        format: String,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Minimum severity to report (info, warning, error)
        #[arg(long)]
        severity: Option<String>,

        /// Minimum severity that drives a nonzero exit
        #[arg(long)]
        fail_on: Option<String>,

        /// Git ref to diff against for change detection
        #[arg(long)]
        base_ref: Option<String>,

        /// Skip git entirely; change detection falls back to hashing
        #[arg(long)]
        no_git: bool,

        /// Ignore and do not write the findings cache
        #[arg(long)]
        no_cache: bool,

        /// Show suppressed findings alongside their suppression source
        #[arg(long)]
        include_suppressed: bool,

        /// Authority dataset directory (overrides configuration)
        #[arg(long)]
        authority_dir: Option<PathBuf>,
    },

    /// Write the current findings to .doxy/baseline.json as accepted debt
    Baseline {
        /// Authority dataset directory (overrides configuration)
        #[arg(long)]
        authority_dir: Option<PathBuf>,
    },

    /// Inspect or clear the findings cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show authority dataset information
    Authority {
        /// Authority dataset directory (overrides configuration)
        #[arg(long)]
        authority_dir: Option<PathBuf>,
    },

    /// Show version info
    Version,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Print cache statistics
    Status,
    /// Delete the cache file
    Clear,
}

/// Run the CLI with parsed arguments, returning the process exit code.
pub fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Some(Commands::Check {
            format,
            output,
            severity,
            fail_on,
            base_ref,
            no_git,
            no_cache,
            include_suppressed,
            authority_dir,
        }) => check::run(check::CheckArgs {
            root: cli.path,
            workers: cli.workers,
            format,
            output,
            severity,
            fail_on,
            base_ref,
            no_git,
            no_cache,
            include_suppressed,
            authority_dir,
        }),

        Some(Commands::Baseline { authority_dir }) => {
            baseline::run(&cli.path, cli.workers, authority_dir)
        }

        Some(Commands::Cache { action }) => cache_cmd::run(&cli.path, action),

        Some(Commands::Authority { authority_dir }) => {
            authority_cmd::run(&cli.path, authority_dir)
        }

        Some(Commands::Version) => {
            println!("doxy {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::Clean)
        }

        // Bare `doxy` is a plain check with defaults.
        None => check::run(check::CheckArgs {
            root: cli.path,
            workers: cli.workers,
            format: "text".into(),
            output: None,
            severity: None,
            fail_on: None,
            base_ref: None,
            no_git: false,
            no_cache: false,
            include_suppressed: false,
            authority_dir: None,
        }),
    }
}
