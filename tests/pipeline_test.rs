//! End-to-end pipeline tests
//!
//! Each test builds a complete fixture project (manifest, lockfile, sources,
//! authority dataset) in its own temp directory and drives the pipeline as
//! a library. Covers the clean path, every finding kind, suppression
//! precedence, incrementality, smart invalidation, and rename migration.

use doxy::config::DoxyConfig;
use doxy::incremental::RunMode;
use doxy::models::{FindingKind, Severity, SuppressionSource};
use doxy::pipeline::{self, RunOptions, RunResult};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

// ----------------------------------------------------------------------------
// Fixture plumbing
// ----------------------------------------------------------------------------

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Authority dataset covering the React symbols the scenarios use.
fn write_authority(dir: &Path) {
    write(
        dir,
        "manifest.json",
        r#"{
            "schemaVersion": 1,
            "dataVersion": "2.1.0",
            "packages": [
                { "name": "react", "latestMappedVersion": "19.0.0", "specFile": "react/18.x.json" }
            ]
        }"#,
    );
    write(
        dir,
        "react/18.x.json",
        r#"{
            "schemaVersion": 1,
            "package": "react",
            "specs": [
                {
                    "export": "useState", "kind": "hook", "availableIn": ">=16.8.0",
                    "signatures": [
                        { "since": "16.8.0", "minArity": 0, "maxArity": 1,
                          "params": [{ "name": "initialState", "required": false }] }
                    ]
                },
                {
                    "export": "useEffect", "kind": "hook", "availableIn": ">=16.8.0",
                    "signatures": [
                        { "since": "16.8.0", "minArity": 1, "maxArity": 2,
                          "params": [{ "name": "effect", "required": true },
                                     { "name": "deps", "required": false }] }
                    ]
                },
                {
                    "export": "useCallback", "kind": "hook", "availableIn": ">=16.8.0",
                    "signatures": [
                        { "since": "16.8.0", "minArity": 1, "maxArity": 2 }
                    ]
                },
                {
                    "export": "useId", "kind": "hook", "availableIn": ">=18.0.0",
                    "signatures": [
                        { "since": "18.0.0", "minArity": 0, "maxArity": 0 }
                    ]
                },
                {
                    "export": "createFactory", "kind": "function",
                    "availableIn": ">=0.14.0 <19.0.0",
                    "signatures": [
                        { "since": "0.14.0", "minArity": 1, "maxArity": 1 }
                    ],
                    "deprecations": [
                        { "since": "16.13.0", "removedIn": "19.0.0",
                          "message": "createFactory is deprecated",
                          "replacement": { "package": "react", "export": "createElement" } }
                    ]
                }
            ]
        }"#,
    );
}

/// A project with react pinned through a lockfile.
fn project(react_version: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "package.json",
        &format!(r#"{{ "dependencies": {{ "react": "^{react_version}", "lodash": "4.17.21" }} }}"#),
    );
    write(
        dir.path(),
        "package-lock.json",
        &format!(
            r#"{{
                "lockfileVersion": 3,
                "packages": {{
                    "node_modules/react": {{ "version": "{react_version}" }},
                    "node_modules/lodash": {{ "version": "4.17.21" }}
                }}
            }}"#
        ),
    );
    write_authority(&dir.path().join(".doxy/authority"));
    dir
}

fn run_doxy(root: &Path) -> RunResult {
    let config = DoxyConfig::load(root).unwrap();
    let mut options = RunOptions::new(root);
    options.no_git = true;
    pipeline::run(&config, options).unwrap()
}

fn run_doxy_with_git(root: &Path, base_ref: Option<&str>) -> RunResult {
    let config = DoxyConfig::load(root).unwrap();
    let mut options = RunOptions::new(root);
    options.base_ref = base_ref.map(String::from);
    pipeline::run(&config, options).unwrap()
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "t")
        .env("GIT_AUTHOR_EMAIL", "t@t")
        .env("GIT_COMMITTER_NAME", "t")
        .env("GIT_COMMITTER_EMAIL", "t@t")
        .output()
        .expect("git runs");
    assert!(output.status.success(), "git {args:?}: {output:?}");
}

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[test]
fn clean_react_18_project_has_no_findings() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/app.tsx",
        "import { useState, useEffect, useCallback } from 'react';\n\
         const [count, setCount] = useState(0);\n\
         useEffect(() => { document.title = String(count); }, [count]);\n\
         const onClick = useCallback(() => setCount(count + 1), [count]);\n",
    );

    let result = run_doxy(dir.path());
    assert_eq!(result.summary.total, 0, "{:#?}", result.findings);
    assert!(!result.should_fail());
}

#[test]
fn deprecated_api_in_installed_version() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/factory.tsx",
        "import { createFactory } from 'react';\nconst div = createFactory('div');\n",
    );

    let result = run_doxy(dir.path());
    let visible = result.visible_findings(false);
    assert_eq!(visible.len(), 1);
    let finding = visible[0];
    assert_eq!(finding.kind, FindingKind::DeprecatedApi);
    assert_eq!(finding.severity, Severity::Warning);
    assert_eq!(finding.location.file, "src/factory.tsx");
    assert_eq!(finding.location.line, 2);
    assert!(finding.message.contains("16.13.0"));
    assert!(finding.message.contains("createElement"));
    // Warning does not fail at the default failOn=error.
    assert!(!result.should_fail());
}

#[test]
fn removed_api_in_installed_version() {
    let dir = project("19.0.0");
    write(
        dir.path(),
        "src/factory.tsx",
        "import { createFactory } from 'react';\nconst div = createFactory('div');\n",
    );

    let result = run_doxy(dir.path());
    let visible = result.visible_findings(false);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].kind, FindingKind::RemovedApi);
    assert_eq!(visible[0].severity, Severity::Error);
    assert!(visible[0].message.contains("19.0.0"));
    assert!(result.should_fail());
}

#[test]
fn future_api_not_yet_introduced() {
    let dir = project("17.0.2");
    write(
        dir.path(),
        "src/id.tsx",
        "import { useId } from 'react';\nconst id = useId();\n",
    );

    let result = run_doxy(dir.path());
    let visible = result.visible_findings(false);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].kind, FindingKind::FutureApi);
    assert!(visible[0].message.contains("18.0.0"));
    assert!(result.should_fail());
}

#[test]
fn wrong_arity_call() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/state.tsx",
        "import { useState } from 'react';\nconst [n] = useState(0, \"extra\");\n",
    );

    let result = run_doxy(dir.path());
    let visible = result.visible_findings(false);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].kind, FindingKind::WrongArity);
    assert!(
        visible[0].message.contains("expected 0\u{2013}1, got 2"),
        "{}",
        visible[0].message
    );
}

#[test]
fn inline_suppression_hides_and_include_suppressed_reveals() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/factory.tsx",
        "import { createFactory } from 'react';\n\
         // doxy-ignore deprecated-api -- migration scheduled\n\
         const div = createFactory('div');\n",
    );

    let result = run_doxy(dir.path());
    assert!(result.visible_findings(false).is_empty());
    assert!(!result.should_fail());

    let with_suppressed = result.visible_findings(true);
    assert_eq!(with_suppressed.len(), 1);
    let info = with_suppressed[0].suppressed.as_ref().unwrap();
    assert_eq!(info.source, SuppressionSource::Inline);
    assert_eq!(info.reason.as_deref(), Some("migration scheduled"));
}

// ----------------------------------------------------------------------------
// Boundary and edge behavior
// ----------------------------------------------------------------------------

#[test]
fn import_only_usage_of_removed_symbol_reports_at_import() {
    let dir = project("19.0.0");
    write(
        dir.path(),
        "src/unused.tsx",
        "import { createFactory } from 'react';\n",
    );

    let result = run_doxy(dir.path());
    let visible = result.visible_findings(false);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].kind, FindingKind::RemovedApi);
    assert_eq!(visible[0].location.line, 1);
}

#[test]
fn per_site_vs_per_usage_emission() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/arity.tsx",
        "import { useState } from 'react';\nuseState(1, 2);\nuseState(3, 4);\n",
    );
    write(
        dir.path(),
        "src/deprecated.tsx",
        "import { createFactory } from 'react';\ncreateFactory('a');\ncreateFactory('b');\n",
    );

    let result = run_doxy(dir.path());
    let arity: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.kind == FindingKind::WrongArity)
        .collect();
    let deprecated: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.kind == FindingKind::DeprecatedApi)
        .collect();
    assert_eq!(arity.len(), 2);
    assert_eq!(deprecated.len(), 1);
}

#[test]
fn unknown_export_is_info_and_does_not_fail() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/unknown.tsx",
        "import { useFancyNewThing } from 'react';\nuseFancyNewThing();\n",
    );

    let result = run_doxy(dir.path());
    let visible = result.visible_findings(false);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].kind, FindingKind::UnknownExport);
    assert!(!result.should_fail());
}

#[test]
fn deterministic_output_across_identical_runs() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/b.tsx",
        "import { createFactory } from 'react';\ncreateFactory('b');\n",
    );
    write(
        dir.path(),
        "src/a.tsx",
        "import { useState } from 'react';\nuseState(1, 2);\n",
    );

    let config = DoxyConfig::load(dir.path()).unwrap();
    let run = || {
        let mut options = RunOptions::new(dir.path());
        options.no_git = true;
        options.no_cache = true;
        pipeline::run(&config, options).unwrap()
    };
    let first = run();
    let second = run();

    let ids = |r: &RunResult| -> Vec<String> {
        r.findings.iter().map(|f| f.long_id.clone()).collect()
    };
    assert_eq!(ids(&first), ids(&second));
    // Sorted by file path, then position, regardless of worker scheduling.
    assert_eq!(first.findings[0].location.file, "src/a.tsx");
    assert_eq!(first.findings[1].location.file, "src/b.tsx");
}

// ----------------------------------------------------------------------------
// Incrementality
// ----------------------------------------------------------------------------

#[test]
fn second_run_serves_from_cache() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/factory.tsx",
        "import { createFactory } from 'react';\ncreateFactory('div');\n",
    );

    let first = run_doxy(dir.path());
    assert_eq!(first.mode, RunMode::Full);
    assert_eq!(first.stats.to_analyze, 1);

    let second = run_doxy(dir.path());
    assert_eq!(second.mode, RunMode::Incremental);
    assert_eq!(second.stats.to_analyze, 0);
    assert_eq!(second.stats.from_cache, 1);

    // Cached findings equal fresh ones, suppression state included.
    let a: Vec<_> = first.findings.iter().map(|f| &f.long_id).collect();
    let b: Vec<_> = second.findings.iter().map(|f| &f.long_id).collect();
    assert_eq!(a, b);
}

#[test]
fn unrelated_lockfile_bump_keeps_cache_valid() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/app.tsx",
        "import { useState } from 'react';\nuseState(0);\n",
    );
    run_doxy(dir.path());

    // Bump lodash only; react, the file's sole import, is untouched.
    write(
        dir.path(),
        "package-lock.json",
        r#"{
            "lockfileVersion": 3,
            "packages": {
                "node_modules/react": { "version": "18.2.0" },
                "node_modules/lodash": { "version": "4.17.22" }
            }
        }"#,
    );
    let result = run_doxy(dir.path());
    assert_eq!(result.stats.from_cache, 1);
    assert_eq!(result.stats.to_analyze, 0);
}

#[test]
fn imported_package_bump_invalidates() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/factory.tsx",
        "import { createFactory } from 'react';\ncreateFactory('div');\n",
    );
    let first = run_doxy(dir.path());
    assert_eq!(first.visible_findings(false)[0].kind, FindingKind::DeprecatedApi);

    // React moves to 19: the file must re-analyze and the finding harden.
    write(
        dir.path(),
        "package-lock.json",
        r#"{
            "lockfileVersion": 3,
            "packages": {
                "node_modules/react": { "version": "19.0.0" },
                "node_modules/lodash": { "version": "4.17.21" }
            }
        }"#,
    );
    let second = run_doxy(dir.path());
    assert_eq!(second.stats.to_analyze, 1);
    assert_eq!(second.visible_findings(false)[0].kind, FindingKind::RemovedApi);
}

#[test]
fn authority_update_invalidates() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/app.tsx",
        "import { useState } from 'react';\nuseState(0);\n",
    );
    run_doxy(dir.path());

    // Bump the dataset version in place.
    let manifest_path = dir.path().join(".doxy/authority/manifest.json");
    let bumped = std::fs::read_to_string(&manifest_path)
        .unwrap()
        .replace("2.1.0", "2.2.0");
    std::fs::write(&manifest_path, bumped).unwrap();

    let result = run_doxy(dir.path());
    assert_eq!(result.stats.to_analyze, 1);
    assert_eq!(result.stats.from_cache, 0);
}

#[test]
fn lockfile_removal_honors_exact_pins() {
    let dir = tempfile::tempdir().unwrap();
    // react declared with a range, lodash pinned exactly.
    write(
        dir.path(),
        "package.json",
        r#"{ "dependencies": { "react": "^18.2.0", "lodash": "4.17.21" } }"#,
    );
    write(
        dir.path(),
        "package-lock.json",
        r#"{
            "lockfileVersion": 3,
            "packages": {
                "node_modules/react": { "version": "18.2.0" },
                "node_modules/lodash": { "version": "4.17.21" }
            }
        }"#,
    );
    write_authority(&dir.path().join(".doxy/authority"));
    write(
        dir.path(),
        "src/react_user.tsx",
        "import { useState } from 'react';\nuseState(0);\n",
    );
    write(
        dir.path(),
        "src/lodash_user.tsx",
        "import { map } from 'lodash';\nmap([], (x) => x);\n",
    );
    run_doxy(dir.path());

    std::fs::remove_file(dir.path().join("package-lock.json")).unwrap();
    let result = run_doxy(dir.path());

    // The react file's range no longer pins a version: re-analyzed. The
    // lodash file imports nothing the authority tracks, so its (empty)
    // version map is trivially unchanged and it stays cached.
    assert_eq!(result.stats.from_cache, 1);
    assert_eq!(result.stats.to_analyze, 1);
}

#[test]
fn rename_migration_bypasses_analysis() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        ".gitignore",
        ".doxy/\nnode_modules/\n",
    );
    write(
        dir.path(),
        "src/old_name.tsx",
        "import { createFactory } from 'react';\ncreateFactory('div');\n",
    );
    git(dir.path(), &["init", "-q", "-b", "main"]);
    git(dir.path(), &["add", "-A"]);
    git(dir.path(), &["commit", "-q", "-m", "initial"]);

    let first = run_doxy_with_git(dir.path(), None);
    assert_eq!(first.stats.to_analyze, 1);
    let first_finding = &first.visible_findings(false)[0];
    assert_eq!(first_finding.location.file, "src/old_name.tsx");
    let (line, column) = (first_finding.location.line, first_finding.location.column);

    git(dir.path(), &["mv", "src/old_name.tsx", "src/new_name.tsx"]);
    git(dir.path(), &["commit", "-q", "-m", "rename"]);

    let second = run_doxy_with_git(dir.path(), Some("HEAD~1"));
    assert_eq!(second.stats.renames_migrated, 1);
    assert_eq!(second.stats.to_analyze, 0, "rename should bypass the worker queue");

    // Finding count and kind preserved; only the file component moved.
    let migrated = second.visible_findings(false);
    assert_eq!(migrated.len(), 1);
    assert_eq!(migrated[0].kind, FindingKind::DeprecatedApi);
    assert_eq!(migrated[0].location.file, "src/new_name.tsx");
    assert_eq!(migrated[0].location.line, line);
    assert_eq!(migrated[0].location.column, column);
    assert!(migrated[0].long_id.contains("src/new_name.tsx"));
}

#[test]
fn suppressed_findings_still_cached_so_rule_edits_apply() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "doxy.toml",
        "[[suppressions]]\nkind = \"deprecated-api\"\nreason = \"accepted for now\"\n",
    );
    write(
        dir.path(),
        "src/factory.tsx",
        "import { createFactory } from 'react';\ncreateFactory('div');\n",
    );

    let first = run_doxy(dir.path());
    assert!(first.visible_findings(false).is_empty());
    assert_eq!(first.visible_findings(true).len(), 1);

    // Cache holds the suppressed finding; a later run still knows it.
    let second = run_doxy(dir.path());
    assert_eq!(second.stats.from_cache, 1);
    let cached = second.visible_findings(true);
    assert_eq!(cached.len(), 1);
    assert_eq!(
        cached[0].suppressed.as_ref().unwrap().source,
        SuppressionSource::Config
    );
}

#[test]
fn removing_config_rule_unsuppresses_cached_finding_without_reanalysis() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "doxy.toml",
        "[[suppressions]]\nkind = \"deprecated-api\"\nreason = \"accepted for now\"\n",
    );
    write(
        dir.path(),
        "src/factory.tsx",
        "import { createFactory } from 'react';\ncreateFactory('div');\n",
    );
    let first = run_doxy(dir.path());
    assert!(first.visible_findings(false).is_empty());

    // Drop the rule. The cache entry stays valid (suppression config is
    // not a validity condition); the marker must be re-judged at merge.
    std::fs::remove_file(dir.path().join("doxy.toml")).unwrap();
    let second = run_doxy(dir.path());
    assert_eq!(second.stats.from_cache, 1);
    assert_eq!(second.stats.to_analyze, 0);
    let visible = second.visible_findings(false);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].kind, FindingKind::DeprecatedApi);
    assert!(visible[0].suppressed.is_none());
}

#[test]
fn adding_config_rule_suppresses_cached_finding_without_reanalysis() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/factory.tsx",
        "import { createFactory } from 'react';\ncreateFactory('div');\n",
    );
    let first = run_doxy(dir.path());
    assert_eq!(first.visible_findings(false).len(), 1);

    write(
        dir.path(),
        "doxy.toml",
        "[[suppressions]]\nkind = \"deprecated-api\"\nreason = \"added after caching\"\n",
    );
    let second = run_doxy(dir.path());
    assert_eq!(second.stats.from_cache, 1);
    assert_eq!(second.stats.to_analyze, 0);
    assert!(second.visible_findings(false).is_empty());
    let hidden = second.visible_findings(true);
    assert_eq!(hidden.len(), 1);
    let info = hidden[0].suppressed.as_ref().unwrap();
    assert_eq!(info.source, SuppressionSource::Config);
    assert_eq!(info.reason.as_deref(), Some("added after caching"));
}

#[test]
fn baseline_suppresses_by_long_id() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/factory.tsx",
        "import { createFactory } from 'react';\ncreateFactory('div');\n",
    );

    let first = run_doxy(dir.path());
    let baseline =
        doxy::suppress::Baseline::from_findings(first.findings.iter());
    baseline.save(dir.path()).unwrap();

    // The cached entry predates the baseline, but the baseline layer is
    // re-judged at merge time: no re-analysis needed.
    let second = run_doxy(dir.path());
    assert_eq!(second.stats.from_cache, 1);
    assert_eq!(second.stats.to_analyze, 0);
    assert!(second.visible_findings(false).is_empty());
    assert_eq!(
        second.visible_findings(true)[0]
            .suppressed
            .as_ref()
            .unwrap()
            .source,
        SuppressionSource::Baseline
    );
}

#[test]
fn doxy_dir_and_node_modules_are_never_candidates() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/ok.tsx",
        "import { useState } from 'react';\nuseState(0);\n",
    );
    write(
        dir.path(),
        "node_modules/react/index.js",
        "module.exports = {};\n",
    );
    write(
        dir.path(),
        ".doxy/scratch.ts",
        "import { createFactory } from 'react';\n",
    );

    let result = run_doxy(dir.path());
    assert_eq!(result.stats.candidates, 1);
    assert!(result.visible_findings(false).is_empty());
}

#[test]
fn config_error_exit_path() {
    let dir = project("18.2.0");
    write(dir.path(), "doxy.toml", "include = 5\n");
    let err = DoxyConfig::load(dir.path()).unwrap_err();
    let any = anyhow::Error::new(err);
    assert_eq!(doxy::error::exit_code_for(&any), 2);
}

#[test]
fn missing_authority_is_authority_error() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{ "dependencies": { "react": "18.2.0" } }"#,
    );
    let config = DoxyConfig::load(dir.path()).unwrap();
    let mut options = RunOptions::new(dir.path());
    options.no_git = true;
    let err = pipeline::run(&config, options).unwrap_err();
    assert_eq!(doxy::error::exit_code_for(&err), 4);
}

#[test]
fn require_suppression_reason_flags_inline_without_reason() {
    let dir = project("18.2.0");
    write(dir.path(), "doxy.toml", "requireSuppressionReason = true\n");
    write(
        dir.path(),
        "src/factory.tsx",
        "import { createFactory } from 'react';\n\
         // doxy-ignore deprecated-api\n\
         createFactory('div');\n",
    );
    let config = DoxyConfig::load(dir.path()).unwrap();
    let mut options = RunOptions::new(dir.path());
    options.no_git = true;
    let err = pipeline::run(&config, options).unwrap_err();
    assert_eq!(doxy::error::exit_code_for(&err), 2);
}

#[test]
fn require_suppression_reason_covers_cache_served_files() {
    let dir = project("18.2.0");
    write(
        dir.path(),
        "src/factory.tsx",
        "import { createFactory } from 'react';\n\
         // doxy-ignore deprecated-api\n\
         createFactory('div');\n",
    );

    // First run with the flag off: the reasonless directive is recorded on
    // the cache entry and the run succeeds.
    let first = run_doxy(dir.path());
    assert!(first.visible_findings(false).is_empty());

    // Turning the flag on does not invalidate the entry; the run-start
    // check must still see the cached file's directive.
    write(dir.path(), "doxy.toml", "requireSuppressionReason = true\n");
    let config = DoxyConfig::load(dir.path()).unwrap();
    let mut options = RunOptions::new(dir.path());
    options.no_git = true;
    let err = pipeline::run(&config, options).unwrap_err();
    assert_eq!(doxy::error::exit_code_for(&err), 2);
    assert!(err.to_string().contains("src/factory.tsx"));
}
