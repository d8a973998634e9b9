//! Incremental engine: run planning, cache validity, rename migration, GC
//!
//! Decides which files need fresh analysis and which can be served from the
//! cache. Content hashing is the authoritative change signal (it works with
//! or without git); the version-control layer contributes renames, which
//! migrate cache entries instead of re-analyzing, and the reason labels in
//! the plan. A cached entry survives only if its content hash, authority
//! version, and the resolved versions of every package it imports are all
//! unchanged, and no package it failed to resolve has since appeared in the
//! authority data.

pub mod git;

use crate::authority::AuthorityStore;
use crate::cache::{hash_file, CacheFile, FileCacheEntry};
use crate::context::RepoContext;
use crate::error::DoxyError;
use crate::models::Finding;
use crate::resolver::extract_package_name;
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use git::{collect_changes, GitChanges, Rename};

/// Why a file is scheduled for fresh analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisReason {
    FileChanged,
    FileNew,
    FileRenamed,
    ManifestChanged,
    AuthorityUpdated,
    ConfigChanged,
    CacheMiss,
}

impl std::fmt::Display for AnalysisReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnalysisReason::FileChanged => "file-changed",
            AnalysisReason::FileNew => "file-new",
            AnalysisReason::FileRenamed => "file-renamed",
            AnalysisReason::ManifestChanged => "manifest-changed",
            AnalysisReason::AuthorityUpdated => "authority-updated",
            AnalysisReason::ConfigChanged => "config-changed",
            AnalysisReason::CacheMiss => "cache-miss",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Full,
    Incremental,
}

/// A file the workers must analyze.
#[derive(Debug, Clone)]
pub struct FileToAnalyze {
    pub path: PathBuf,
    /// Root-relative path with forward slashes; the cache key.
    pub rel: String,
    pub reason: AnalysisReason,
}

/// A file served from the cache without touching a worker.
#[derive(Debug, Clone)]
pub struct CachedFile {
    pub rel: String,
    pub findings: Vec<Finding>,
    /// Lines of reasonless inline suppressions recorded at analysis time;
    /// the requireSuppressionReason check must see cached files too.
    pub reasonless_suppression_lines: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct PlanStats {
    pub candidates: usize,
    pub to_analyze: usize,
    pub from_cache: usize,
    pub renames_migrated: usize,
}

/// The engine's decision for one invocation.
pub struct RunPlan {
    pub files_to_analyze: Vec<FileToAnalyze>,
    pub cached_files: Vec<CachedFile>,
    pub mode: RunMode,
    pub base_ref: Option<String>,
    pub git_available: bool,
    pub renames: Vec<Rename>,
    pub stats: PlanStats,
}

/// Options influencing planning, straight from config + CLI.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub base_ref: Option<String>,
    pub no_git: bool,
}

/// Build the run plan. Mutates the cache in place: renamed entries are
/// migrated to their new keys before validity is judged.
pub fn plan_run(
    root: &Path,
    ctx: &RepoContext,
    authority: &AuthorityStore,
    cache: Option<&mut CacheFile>,
    options: &PlanOptions,
    extensions: &[&str],
) -> Result<RunPlan, DoxyError> {
    let changes = if options.no_git {
        GitChanges::default()
    } else {
        git::collect_changes(root, options.base_ref.as_deref())?
    };

    let candidates = discover_candidates(root, options, extensions)?;

    let (cache_present, same_version) = match &cache {
        Some(cache) => (true, cache.same_version()),
        None => (false, false),
    };
    let mode = if cache_present && same_version {
        RunMode::Incremental
    } else {
        RunMode::Full
    };

    let mut stats = PlanStats {
        candidates: candidates.len(),
        ..Default::default()
    };
    let mut files_to_analyze = Vec::new();
    let mut cached_files = Vec::new();
    let mut renames = Vec::new();

    match cache {
        Some(cache) if mode == RunMode::Incremental => {
            renames = migrate_renames(cache, root, &changes.renames, ctx, authority);
            stats.renames_migrated = renames.len();

            // Hash every candidate that has a cache entry, in parallel.
            let hashes: BTreeMap<String, Option<String>> = candidates
                .par_iter()
                .filter(|(_, rel)| cache.entries.contains_key(rel))
                .map(|(path, rel)| (rel.clone(), hash_file(path).ok()))
                .collect();

            for (path, rel) in candidates {
                let Some(entry) = cache.entries.get(&rel) else {
                    files_to_analyze.push(FileToAnalyze {
                        path,
                        rel,
                        reason: AnalysisReason::FileNew,
                    });
                    continue;
                };
                let current_hash = hashes.get(&rel).and_then(|h| h.as_deref());
                match check_entry(entry, current_hash, ctx, authority) {
                    None => cached_files.push(CachedFile {
                        rel,
                        findings: entry.findings.clone(),
                        reasonless_suppression_lines: entry
                            .reasonless_suppression_lines
                            .clone(),
                    }),
                    Some(reason) => files_to_analyze.push(FileToAnalyze {
                        path,
                        rel,
                        reason,
                    }),
                }
            }
        }
        _ => {
            let reason = if cache_present {
                // A cache from another doxy version: config fingerprint
                // changed, rerun everything.
                AnalysisReason::ConfigChanged
            } else {
                AnalysisReason::CacheMiss
            };
            for (path, rel) in candidates {
                files_to_analyze.push(FileToAnalyze { path, rel, reason });
            }
        }
    }

    stats.to_analyze = files_to_analyze.len();
    stats.from_cache = cached_files.len();

    info!(
        "run plan: {} to analyze, {} cached, mode {:?}, git {}",
        stats.to_analyze, stats.from_cache, mode, changes.available
    );

    Ok(RunPlan {
        files_to_analyze,
        cached_files,
        mode,
        base_ref: options.base_ref.clone(),
        git_available: changes.available,
        renames,
        stats,
    })
}

/// Candidate source files under the include/exclude globs, gitignore
/// respected, sorted for determinism.
fn discover_candidates(
    root: &Path,
    options: &PlanOptions,
    extensions: &[&str],
) -> Result<Vec<(PathBuf, String)>, DoxyError> {
    let include = build_globset(&options.include)?;
    let exclude = build_globset(&options.exclude)?;

    let walker = ignore::WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .build();

    let mut candidates = Vec::new();
    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !extensions.contains(&ext) {
            continue;
        }
        let Ok(rel_path) = path.strip_prefix(root) else {
            continue;
        };
        let rel = rel_path.to_string_lossy().replace('\\', "/");
        if rel.starts_with(".doxy/") || rel.contains("node_modules/") {
            continue;
        }
        if let Some(include) = &include {
            if !include.is_match(&rel) {
                continue;
            }
        }
        if let Some(exclude) = &exclude {
            if exclude.is_match(&rel) {
                continue;
            }
        }
        candidates.push((path.to_path_buf(), rel));
    }
    candidates.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(candidates)
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>, DoxyError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| DoxyError::Config(format!("invalid glob '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| DoxyError::Config(format!("cannot build glob set: {e}")))
}

/// Judge one cache entry. `None` means valid; `Some(reason)` schedules
/// re-analysis.
fn check_entry(
    entry: &FileCacheEntry,
    current_hash: Option<&str>,
    ctx: &RepoContext,
    authority: &AuthorityStore,
) -> Option<AnalysisReason> {
    if current_hash != Some(entry.content_hash.as_str()) {
        return Some(AnalysisReason::FileChanged);
    }
    if authority.data_version() != entry.authority_version {
        return Some(AnalysisReason::AuthorityUpdated);
    }
    // Entries from before per-file tracking cannot be judged precisely.
    let Some(imported) = &entry.imported_packages else {
        return Some(AnalysisReason::ConfigChanged);
    };
    // Global context match short-circuits; otherwise the per-file smart
    // check lets unrelated lockfile bumps through.
    if ctx.context_hash != entry.repo_context_hash {
        for package in imported {
            let current = ctx.pinned_version(package).map(|v| v.to_string());
            let stored = entry.package_versions.get(package).cloned();
            if current != stored {
                return Some(AnalysisReason::ManifestChanged);
            }
        }
    }
    // A package that was unresolved at analysis time and is now covered by
    // the authority data would produce new findings.
    for source in &entry.unresolved_imports {
        if let Some(package) = extract_package_name(source) {
            if authority.has_package(&package) {
                return Some(AnalysisReason::AuthorityUpdated);
            }
        }
    }
    None
}

/// Migrate cache entries across reported renames. An entry migrates only
/// when it would otherwise be valid and the new file's bytes are identical;
/// anything else deletes the stale entry and lets the new path analyze
/// fresh.
fn migrate_renames(
    cache: &mut CacheFile,
    root: &Path,
    renames: &[Rename],
    ctx: &RepoContext,
    authority: &AuthorityStore,
) -> Vec<Rename> {
    let mut migrated = Vec::new();
    for rename in renames {
        let Some(entry) = cache.entries.remove(&rename.from) else {
            continue;
        };
        let new_hash = hash_file(&root.join(&rename.to)).ok();
        let content_matches = new_hash.as_deref() == Some(entry.content_hash.as_str());
        let rest_valid =
            check_entry(&entry, Some(entry.content_hash.as_str()), ctx, authority).is_none();
        if !content_matches || !rest_valid {
            debug!(
                "rename {} -> {}: content or context changed, dropping entry",
                rename.from, rename.to
            );
            continue;
        }

        let mut entry = entry;
        entry.file_path = rename.to.clone();
        for finding in &mut entry.findings {
            finding.location.file = rename.to.clone();
            finding.long_id = crate::models::make_long_id(
                &finding.symbol.package,
                &finding.symbol.export,
                &rename.to,
                finding.location.line,
                finding.location.column,
            );
            finding.id = crate::models::short_id(&finding.long_id);
        }
        cache.entries.insert(rename.to.clone(), entry);
        migrated.push(rename.clone());
        debug!("migrated cache entry {} -> {}", rename.from, rename.to);
    }
    migrated
}

/// Drop cache entries whose files no longer exist. Runs unconditionally at
/// end of run (branch switches and external deletes leave no other trace).
pub fn gc(cache: &mut CacheFile, root: &Path) -> usize {
    let before = cache.entries.len();
    cache.entries.retain(|rel, _| root.join(rel).is_file());
    let removed = before - cache.entries.len();
    if removed > 0 {
        debug!("cache GC removed {removed} dead entries");
    }
    removed
}
