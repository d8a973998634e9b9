//! Doxy - static API-compatibility verifier
//!
//! Checks imported symbols and call sites against version-indexed API
//! specifications for the dependency versions the project has locked.

use clap::Parser;
use doxy::cli;
use doxy::error::exit_code_for;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Initialize logging; findings own stdout, logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = cli::Cli::parse();
    match cli::run(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(exit_code_for(&err));
        }
    }
}
