//! The `authority` command: dataset inspection

use crate::config::DoxyConfig;
use crate::error::ExitCode;
use crate::pipeline;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub fn run(root: &Path, authority_dir: Option<PathBuf>) -> Result<ExitCode> {
    let config = DoxyConfig::load(root)?;
    let authority = pipeline::build_authority(root, &config, authority_dir.as_deref())?;

    println!("authority data v{}", authority.data_version());
    println!("  content hash: {}", authority.content_hash());
    println!("  specs:        {}", authority.spec_count());
    println!("  packages:");
    for package in authority.covered_packages() {
        println!("    {package}");
    }
    Ok(ExitCode::Clean)
}
