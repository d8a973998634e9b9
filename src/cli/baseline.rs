//! The `baseline` command: accept the current findings as known debt

use crate::config::DoxyConfig;
use crate::error::ExitCode;
use crate::pipeline::{self, RunOptions};
use crate::suppress::Baseline;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub fn run(root: &Path, workers: usize, authority_dir: Option<PathBuf>) -> Result<ExitCode> {
    let config = DoxyConfig::load(root)?;

    let mut options = RunOptions::new(root);
    options.workers = workers;
    options.authority_dir = authority_dir;

    let result = pipeline::run(&config, options)?;
    let visible: Vec<_> = result
        .findings
        .iter()
        .filter(|f| !f.is_suppressed())
        .collect();

    let baseline = Baseline::from_findings(visible.iter().copied());
    baseline.save(root)?;
    eprintln!(
        "baseline written: {} findings accepted at {}",
        baseline.finding_ids.len(),
        Baseline::path(root).display()
    );
    Ok(ExitCode::Clean)
}
