//! Per-file worker
//!
//! One worker invocation owns one file end to end: read bytes, hash, parse
//! (under a wall-clock budget), scan suppressions, resolve imports, analyze,
//! apply suppressions, and assemble the cache entry. Parse failures and
//! timeouts are contained: they yield an internal info finding and no cache
//! entry, so the file is retried next run.

use crate::analyzer::analyze_file;
use crate::ast::NormalizedAst;
use crate::authority::AuthorityStore;
use crate::cache::{hash_bytes, FileCacheEntry};
use crate::context::RepoContext;
use crate::incremental::FileToAnalyze;
use crate::models::Finding;
use crate::parse::ParserRegistry;
use crate::resolver::{self, AdapterRegistry};
use crate::suppress::{self, Baseline, CompiledRule};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What one worker hands back to the orchestrator.
pub struct FileOutcome {
    pub rel: String,
    pub findings: Vec<Finding>,
    /// Absent when analysis failed; the file will be retried next run.
    pub cache_entry: Option<FileCacheEntry>,
    /// Lines of inline suppressions missing a reason, for the
    /// requireSuppressionReason check.
    pub reasonless_suppression_lines: Vec<u32>,
}

#[allow(clippy::too_many_arguments)]
pub fn analyze_one(
    file: &FileToAnalyze,
    ctx: &RepoContext,
    authority: &AuthorityStore,
    config_rules: &[CompiledRule],
    baseline: Option<&Baseline>,
    path_aliases: &BTreeMap<String, String>,
    registry: &Arc<ParserRegistry>,
    timeout: Duration,
) -> FileOutcome {
    let rel = file.rel.clone();
    debug!("analyzing {rel} ({})", file.reason);

    let bytes = match std::fs::read(&file.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("cannot read {rel}: {e}");
            return FileOutcome {
                findings: vec![super::internal_finding(
                    &rel,
                    "read-error",
                    format!("could not read file: {e}"),
                )],
                rel,
                cache_entry: None,
                reasonless_suppression_lines: Vec::new(),
            };
        }
    };
    let content_hash = hash_bytes(&bytes);
    let source = String::from_utf8_lossy(&bytes).into_owned();
    drop(bytes);

    let ast = match parse_with_timeout(registry, &file.path, source, timeout) {
        Ok(Some(ast)) => ast,
        Ok(None) => {
            warn!("parse of {rel} exceeded {}s, abandoned", timeout.as_secs());
            return FileOutcome {
                findings: vec![super::internal_finding(
                    &rel,
                    "parse-timeout",
                    format!("parse exceeded the {}s budget", timeout.as_secs()),
                )],
                rel,
                cache_entry: None,
                reasonless_suppression_lines: Vec::new(),
            };
        }
        Err(message) => {
            warn!("parse of {rel} failed: {message}");
            return FileOutcome {
                findings: vec![super::internal_finding(&rel, "parse-error", message)],
                rel,
                cache_entry: None,
                reasonless_suppression_lines: Vec::new(),
            };
        }
    };

    let inline = suppress::parse_inline(&ast.comments);
    let reasonless_suppression_lines: Vec<u32> = inline
        .iter()
        .filter(|s| s.reason.is_none())
        .map(|s| s.start_line)
        .collect();

    let tracked: BTreeSet<String> = authority
        .covered_packages()
        .into_iter()
        .map(str::to_string)
        .collect();
    let adapters = AdapterRegistry::for_frameworks(&ctx.frameworks);
    let resolved = resolver::resolve_imports(&ast, Some(&tracked), &adapters, path_aliases);

    let mut findings = analyze_file(&rel, &resolved.usages, ctx, authority);
    suppress::apply_suppressions(&mut findings, &inline, config_rules, baseline);

    let package_versions: BTreeMap<String, String> = resolved
        .imported_packages
        .iter()
        .filter_map(|p| ctx.pinned_version(p).map(|v| (p.clone(), v.to_string())))
        .collect();

    let cache_entry = FileCacheEntry {
        file_path: rel.clone(),
        content_hash,
        authority_version: authority.data_version().to_string(),
        repo_context_hash: ctx.context_hash.clone(),
        imported_packages: Some(resolved.imported_packages.iter().cloned().collect()),
        package_versions,
        unresolved_imports: resolved.unresolved_imports.clone(),
        reasonless_suppression_lines: reasonless_suppression_lines.clone(),
        findings: findings.clone(),
        analyzed_at: Utc::now().to_rfc3339(),
        extra: BTreeMap::new(),
    };

    FileOutcome {
        rel,
        findings,
        cache_entry: Some(cache_entry),
        reasonless_suppression_lines,
    }
}

/// Run the parse under a watchdog. `Ok(None)` is a timeout; the abandoned
/// parse thread finishes (and is discarded) in the background, which keeps
/// a pathological file from wedging a worker slot forever.
fn parse_with_timeout(
    registry: &Arc<ParserRegistry>,
    path: &std::path::Path,
    source: String,
    timeout: Duration,
) -> Result<Option<NormalizedAst>, String> {
    if registry.for_path(path).is_none() {
        return Err(format!("no parser registered for {}", path.display()));
    }

    let (tx, rx) = crossbeam_channel::bounded(1);
    let registry = Arc::clone(registry);
    let path = path.to_path_buf();
    std::thread::spawn(move || {
        let result = registry
            .for_path(&path)
            .expect("checked above")
            .parse(&path, &source)
            .map_err(|e| format!("{e:#}"));
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(ast)) => Ok(Some(ast)),
        Ok(Err(message)) => Err(message),
        Err(_) => Ok(None),
    }
}
