//! Pipeline orchestrator
//!
//! Sequences the run: repo context, authority store, run plan, per-file
//! analysis on a bounded worker pool, merge with still-valid cached
//! findings, then GC and an atomic cache rewrite. The five steps are
//! exposed individually so a front-end can substitute any of them; `run`
//! is the canonical sequencing.
//!
//! Workers never touch shared mutable state: each returns its findings and
//! a fresh cache entry, and the orchestrator writes the consolidated cache
//! once at end of run. Cancellation is honored between files; in-flight
//! files complete so the cache stays consistent.

use crate::authority::AuthorityStore;
use crate::cache::CacheFile;
use crate::config::DoxyConfig;
use crate::context::RepoContext;
use crate::error::DoxyError;
use crate::incremental::{self, PlanOptions, RunMode, RunPlan};
use crate::models::{
    make_long_id, short_id, AuthorityRef, Finding, FindingKind, FindingsSummary, Location,
    Severity, SymbolRef,
};
use crate::parse::ParserRegistry;
use crate::suppress::{self, Baseline, CompiledRule};
use anyhow::Result;
use chrono::Utc;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub mod worker;

pub use worker::FileOutcome;

/// Progress callback: (current file, done, total).
pub type ProgressCallback = Box<dyn Fn(&str, usize, usize) + Send + Sync>;

/// Everything a single invocation needs.
pub struct RunOptions {
    pub root: PathBuf,
    pub base_ref: Option<String>,
    pub no_git: bool,
    /// Worker threads; 0 auto-detects (capped at 16).
    pub workers: usize,
    /// Authority dataset root override (beats configuration).
    pub authority_dir: Option<PathBuf>,
    /// Skip reading and writing the cache entirely.
    pub no_cache: bool,
    /// Per-file wall-clock budget before a parse is abandoned.
    pub file_timeout: Duration,
    /// Cooperative cancellation; set to true to stop dispatching files.
    pub cancel: Arc<AtomicBool>,
    pub progress: Option<ProgressCallback>,
}

impl RunOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base_ref: None,
            no_git: false,
            workers: 0,
            authority_dir: None,
            no_cache: false,
            file_timeout: Duration::from_secs(10),
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }
}

/// The outcome of a run.
#[derive(Debug)]
pub struct RunResult {
    /// Merged findings (fresh + cached), deterministically sorted,
    /// suppressed ones included and marked.
    pub findings: Vec<Finding>,
    /// Summary over visible findings at or above the severity floor.
    pub summary: FindingsSummary,
    pub mode: RunMode,
    pub git_available: bool,
    pub stats: incremental::PlanStats,
    pub duration_ms: u64,
    pub severity_floor: Severity,
    pub fail_on: Severity,
}

impl RunResult {
    /// Findings that reporters should show.
    pub fn visible_findings(&self, include_suppressed: bool) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| include_suppressed || !f.is_suppressed())
            .filter(|f| f.severity >= self.severity_floor || f.is_suppressed())
            .collect()
    }

    /// Whether the findings-present exit (1) applies.
    pub fn should_fail(&self) -> bool {
        self.findings
            .iter()
            .any(|f| !f.is_suppressed() && f.severity >= self.fail_on)
    }
}

// ----------------------------------------------------------------------------
// The five pipeline steps
// ----------------------------------------------------------------------------

/// Step 1: build the repo context.
pub fn load_repo_context(root: &Path, config: &DoxyConfig) -> Result<RepoContext, DoxyError> {
    RepoContext::build(root, &config.frameworks)
}

/// Step 2: load the authority store.
pub fn build_authority(
    root: &Path,
    config: &DoxyConfig,
    override_dir: Option<&Path>,
) -> Result<AuthorityStore, DoxyError> {
    let roots = config.authority_roots(root, override_dir);
    AuthorityStore::load_sources(&roots)
}

/// Step 3: plan the run (delegates to the incremental engine).
pub fn plan_run(
    root: &Path,
    ctx: &RepoContext,
    authority: &AuthorityStore,
    cache: Option<&mut CacheFile>,
    config: &DoxyConfig,
    options: &RunOptions,
    registry: &ParserRegistry,
) -> Result<RunPlan, DoxyError> {
    incremental::plan_run(
        root,
        ctx,
        authority,
        cache,
        &PlanOptions {
            include: config.include.clone(),
            exclude: config.exclude.clone(),
            base_ref: options.base_ref.clone(),
            no_git: options.no_git,
        },
        &registry.extensions(),
    )
}

/// Import-source prefix rewrites for this run: the configured map plus the
/// type-compiler's `paths` (first target wins).
pub fn merged_path_aliases(config: &DoxyConfig, ctx: &RepoContext) -> BTreeMap<String, String> {
    let mut aliases = config.path_aliases.clone();
    for (prefix, targets) in &ctx.compiler.paths {
        if let Some(first) = targets.first() {
            aliases
                .entry(prefix.clone())
                .or_insert_with(|| first.clone());
        }
    }
    aliases
}

/// Step 4: analyze the planned files on the worker pool.
#[allow(clippy::too_many_arguments)]
pub fn analyze_files(
    plan: &RunPlan,
    ctx: &RepoContext,
    authority: &AuthorityStore,
    config_rules: &[CompiledRule],
    baseline: Option<&Baseline>,
    path_aliases: &BTreeMap<String, String>,
    registry: &Arc<ParserRegistry>,
    options: &RunOptions,
) -> Result<Vec<FileOutcome>> {
    let workers = effective_workers(options.workers);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;

    let total = plan.files_to_analyze.len();
    let done = AtomicUsize::new(0);
    let cancel = Arc::clone(&options.cancel);

    debug!("analyzing {total} files on {workers} workers");
    let outcomes: Vec<FileOutcome> = pool.install(|| {
        plan.files_to_analyze
            .par_iter()
            .filter_map(|file| {
                // Cancellation gate: no new file starts, in-flight ones
                // finish normally.
                if cancel.load(Ordering::SeqCst) {
                    return None;
                }
                let outcome = worker::analyze_one(
                    file,
                    ctx,
                    authority,
                    config_rules,
                    baseline,
                    path_aliases,
                    registry,
                    options.file_timeout,
                );
                let n = done.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(progress) = &options.progress {
                    progress(&file.rel, n, total);
                }
                Some(outcome)
            })
            .collect()
    });

    Ok(outcomes)
}

/// Step 5: merge fresh findings with still-valid cached findings in the
/// stable output order: file path, then line and column, then long id.
///
/// Cached findings carry the suppression verdicts of their analysis run;
/// the config-rule and baseline layers are re-judged here against the
/// current rules, which is what lets suppression edits land without
/// re-analysis. Inline markers are kept: the directives live in the file,
/// so changing them changes the content hash and invalidates the entry.
pub fn merge_with_cache(
    outcomes: &[FileOutcome],
    cached: &[incremental::CachedFile],
    config_rules: &[CompiledRule],
    baseline: Option<&Baseline>,
) -> Vec<Finding> {
    let mut findings: Vec<Finding> = Vec::new();
    for outcome in outcomes {
        findings.extend(outcome.findings.iter().cloned());
    }
    for file in cached {
        let mut refreshed = file.findings.clone();
        suppress::refresh_suppressions(&mut refreshed, config_rules, baseline);
        findings.extend(refreshed);
    }
    findings.sort_by(|a, b| {
        (
            &a.location.file,
            a.location.line,
            a.location.column,
            &a.long_id,
        )
            .cmp(&(
                &b.location.file,
                b.location.line,
                b.location.column,
                &b.long_id,
            ))
    });
    findings
}

// ----------------------------------------------------------------------------
// Canonical sequencing
// ----------------------------------------------------------------------------

/// Run the whole pipeline for one invocation.
pub fn run(config: &DoxyConfig, options: RunOptions) -> Result<RunResult> {
    let started = Instant::now();
    let root = options.root.clone();

    let ctx = load_repo_context(&root, config)?;
    let authority = build_authority(&root, config, options.authority_dir.as_deref())?;
    let config_rules = suppress::compile_rules(&config.suppressions)?;
    let baseline = Baseline::load(&root)?;
    let registry = Arc::new(ParserRegistry::with_defaults());

    let mut cache = if options.no_cache {
        None
    } else {
        CacheFile::load(&root)
    };

    let plan = plan_run(
        &root,
        &ctx,
        &authority,
        cache.as_mut(),
        config,
        &options,
        &registry,
    )?;

    let path_aliases = merged_path_aliases(config, &ctx);
    let outcomes = analyze_files(
        &plan,
        &ctx,
        &authority,
        &config_rules,
        baseline.as_ref(),
        &path_aliases,
        &registry,
        &options,
    )?;

    // Inline directives without a reason become a configuration error when
    // the project demands reasons. Checked against parsed suppressions, so
    // it runs after the parse stage; cache-served files contribute the
    // directive lines their entries recorded at analysis time.
    if config.require_suppression_reason {
        let mut offenders: Vec<String> = outcomes
            .iter()
            .flat_map(|o| {
                o.reasonless_suppression_lines
                    .iter()
                    .map(|line| format!("{}:{line}", o.rel))
            })
            .chain(plan.cached_files.iter().flat_map(|c| {
                c.reasonless_suppression_lines
                    .iter()
                    .map(|line| format!("{}:{line}", c.rel))
            }))
            .collect();
        if !offenders.is_empty() {
            offenders.sort();
            offenders.truncate(5);
            return Err(DoxyError::Config(format!(
                "requireSuppressionReason is set but inline suppressions without a reason exist: {}",
                offenders.join(", ")
            ))
            .into());
        }
    }

    let findings = merge_with_cache(&outcomes, &plan.cached_files, &config_rules, baseline.as_ref());

    if !options.no_cache {
        let mut cache = cache.unwrap_or_else(CacheFile::new_empty);
        if plan.mode == RunMode::Full {
            cache.entries.clear();
        }
        for outcome in &outcomes {
            if let Some(entry) = &outcome.cache_entry {
                cache.entries.insert(outcome.rel.clone(), entry.clone());
            }
        }
        let removed = incremental::gc(&mut cache, &root);
        if removed > 0 {
            debug!("gc removed {removed} entries");
        }
        cache.doxy_version = env!("CARGO_PKG_VERSION").to_string();
        if cache.created_at.is_empty() {
            cache.created_at = Utc::now().to_rfc3339();
        }
        if let Err(e) = cache.save(&root) {
            warn!("failed to write cache: {e:#}");
        }
    }

    let severity_floor = config.severity_floor();
    let visible: Vec<Finding> = findings
        .iter()
        .filter(|f| !f.is_suppressed() && f.severity >= severity_floor)
        .cloned()
        .collect();
    let summary = FindingsSummary::from_findings(&visible);

    let duration_ms = started.elapsed().as_millis() as u64;
    info!(
        "analyzed {} files ({} cached) in {}ms: {} findings visible",
        plan.stats.to_analyze, plan.stats.from_cache, duration_ms, summary.total
    );

    Ok(RunResult {
        findings,
        summary,
        mode: plan.mode,
        git_available: plan.git_available,
        stats: plan.stats,
        duration_ms,
        severity_floor,
        fail_on: config.fail_on(),
    })
}

fn effective_workers(requested: usize) -> usize {
    if requested == 0 {
        std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4)
            .min(16)
    } else {
        requested
    }
}

/// Build the internal info finding that contains a per-file failure.
pub(crate) fn internal_finding(rel: &str, code: &'static str, message: String) -> Finding {
    let long_id = make_long_id("doxy", code, rel, 1, 1);
    Finding {
        id: short_id(&long_id),
        long_id,
        kind: FindingKind::InternalError,
        severity: Severity::Info,
        location: Location::new(rel, 1, 1),
        message,
        symbol: SymbolRef {
            package: "doxy".into(),
            export: code.into(),
            installed_version: None,
        },
        fixes: Vec::new(),
        authority: AuthorityRef::default(),
        suppressed: None,
    }
}
