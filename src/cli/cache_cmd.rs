//! The `cache` command: findings-cache maintenance

use crate::cache::CacheFile;
use crate::cli::CacheAction;
use crate::error::ExitCode;
use anyhow::{Context, Result};
use std::path::Path;

pub fn run(root: &Path, action: CacheAction) -> Result<ExitCode> {
    match action {
        CacheAction::Status => status(root),
        CacheAction::Clear => clear(root),
    }
}

fn status(root: &Path) -> Result<ExitCode> {
    match CacheFile::load(root) {
        Some(cache) => {
            let findings: usize = cache.entries.values().map(|e| e.findings.len()).sum();
            println!("cache: {}", CacheFile::path(root).display());
            println!("  entries:      {}", cache.entries.len());
            println!("  findings:     {findings}");
            println!("  written by:   doxy {}", cache.doxy_version);
            println!("  created at:   {}", cache.created_at);
        }
        None => println!("no cache at {}", CacheFile::path(root).display()),
    }
    Ok(ExitCode::Clean)
}

fn clear(root: &Path) -> Result<ExitCode> {
    let path = CacheFile::path(root);
    if path.exists() {
        std::fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        eprintln!("removed {}", path.display());
    } else {
        eprintln!("no cache to remove");
    }
    Ok(ExitCode::Clean)
}
