//! The `check` command: run the pipeline and report findings

use crate::config::DoxyConfig;
use crate::error::{DoxyError, ExitCode};
use crate::models::Severity;
use crate::pipeline::{self, RunOptions};
use crate::reporters::{self, OutputFormat};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::str::FromStr;

pub struct CheckArgs {
    pub root: PathBuf,
    pub workers: usize,
    pub format: String,
    pub output: Option<PathBuf>,
    pub severity: Option<String>,
    pub fail_on: Option<String>,
    pub base_ref: Option<String>,
    pub no_git: bool,
    pub no_cache: bool,
    pub include_suppressed: bool,
    pub authority_dir: Option<PathBuf>,
}

pub fn run(args: CheckArgs) -> Result<ExitCode> {
    let format = OutputFormat::from_str(&args.format).map_err(|e| DoxyError::Config(e.to_string()))?;

    let mut config = DoxyConfig::load(&args.root)?;
    if let Some(severity) = &args.severity {
        config.severity =
            Some(Severity::from_str(severity).map_err(DoxyError::Config)?);
    }
    if let Some(fail_on) = &args.fail_on {
        config.fail_on = Some(Severity::from_str(fail_on).map_err(DoxyError::Config)?);
    }

    let mut options = RunOptions::new(&args.root);
    options.workers = args.workers;
    options.base_ref = args.base_ref.clone();
    options.no_git = args.no_git;
    options.no_cache = args.no_cache;
    options.authority_dir = args.authority_dir.clone();

    // Progress on stderr only for interactive text runs; machine formats
    // stay clean.
    let bar = if format == OutputFormat::Text && console::user_attended_stderr() {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} {pos}/{len} {msg}")
                .expect("valid progress template"),
        );
        Some(bar)
    } else {
        None
    };
    if let Some(bar) = bar.clone() {
        options.progress = Some(Box::new(move |file, done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
            bar.set_message(file.to_string());
        }));
    }

    let result = pipeline::run(&config, options)?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let visible = result.visible_findings(args.include_suppressed);
    let rendered = reporters::render(format, &result, &visible)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing report to {}", path.display()))?;
            eprintln!("report written to {}", path.display());
        }
        None => print!("{rendered}"),
    }

    if result.should_fail() {
        Ok(ExitCode::FindingsPresent)
    } else {
        Ok(ExitCode::Clean)
    }
}
