//! Usage classification against the authority store
//!
//! Joins a file's resolved symbol usages with version-parameterized spec
//! queries and emits findings. Classification is ordered and the first
//! matching rule wins per usage: unknown export, future API, removed API,
//! active deprecation, then per-site signature checks. The state rules fire
//! once per usage at its first site to keep noise down; signature checks
//! fire per site.

use crate::authority::{AuthorityStore, ResolvedApiSpec};
use crate::context::RepoContext;
use crate::models::{
    make_long_id, short_id, AuthorityRef, Finding, FindingKind, FixSuggestion, Location, SymbolRef,
};
use crate::resolver::{SymbolUsage, UsageSite};
use semver::Version;
use tracing::debug;

/// Analyze one file's usages. `file` is the repo-relative path used in
/// locations and long ids. Suppressions are applied by the caller.
pub fn analyze_file(
    file: &str,
    usages: &[SymbolUsage],
    ctx: &RepoContext,
    authority: &AuthorityStore,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    for usage in usages {
        let Some(version) = ctx.analysis_version(&usage.package) else {
            // Imported but not declared anywhere; no version to judge
            // against.
            debug!(
                "{file}: no resolvable version for {}, skipping {}",
                usage.package, usage.export
            );
            continue;
        };
        let Some(first_site) = usage.sites.first() else {
            continue;
        };

        let resolved = authority.get_api_spec_at(&usage.package, &usage.export, &version);

        let Some(resolved) = resolved else {
            if authority.has_package(&usage.package) {
                findings.push(build(
                    file,
                    usage,
                    first_site,
                    FindingKind::UnknownExport,
                    format!(
                        "'{}' is not a known export of {} (authority data v{})",
                        usage.export,
                        usage.package,
                        authority.data_version()
                    ),
                    &version,
                    authority,
                    None,
                ));
            }
            continue;
        };

        if !resolved.available && resolved.is_future {
            let introduced = resolved
                .spec
                .available_in
                .min_version()
                .map(|v| v.to_string())
                .unwrap_or_else(|| resolved.spec.available_in.raw().to_string());
            findings.push(build(
                file,
                usage,
                first_site,
                FindingKind::FutureApi,
                format!(
                    "'{}' is not yet available in {} {version}; it was introduced in {introduced}",
                    usage.export, usage.package
                ),
                &version,
                authority,
                Some(&resolved),
            ));
            continue;
        }

        if !resolved.available {
            let removed_in = resolved
                .active_deprecation
                .as_ref()
                .and_then(|d| d.removed_in.as_ref());
            let mut message = match removed_in {
                Some(r) => format!(
                    "'{}' was removed from {} in {r} (installed: {version})",
                    usage.export, usage.package
                ),
                None => format!(
                    "'{}' is not available in {} {version}",
                    usage.export, usage.package
                ),
            };
            if let Some(replacement) = resolved
                .active_deprecation
                .as_ref()
                .and_then(|d| d.replacement.as_ref())
            {
                message.push_str(&format!(
                    "; use {}/{} instead",
                    replacement.package, replacement.export
                ));
            }
            findings.push(build(
                file,
                usage,
                first_site,
                FindingKind::RemovedApi,
                message,
                &version,
                authority,
                Some(&resolved),
            ));
            continue;
        }

        if let Some(deprecation) = &resolved.active_deprecation {
            let mut message = format!(
                "'{}' is deprecated in {} since {}: {}",
                usage.export, usage.package, deprecation.since, deprecation.message
            );
            if let Some(replacement) = &deprecation.replacement {
                message.push_str(&format!(
                    " (use {}/{})",
                    replacement.package, replacement.export
                ));
            }
            findings.push(build(
                file,
                usage,
                first_site,
                FindingKind::DeprecatedApi,
                message,
                &version,
                authority,
                Some(&resolved),
            ));
            continue;
        }

        // Signature checks, per site.
        let Some(signature) = &resolved.active_signature else {
            continue;
        };
        for site in &usage.sites {
            if let Some(arg_count) = site.arg_count {
                let below = arg_count < signature.min_arity;
                let above = signature
                    .max_arity
                    .map(|max| arg_count > max)
                    .unwrap_or(false);
                if below || above {
                    findings.push(build_at(
                        file,
                        usage,
                        site,
                        FindingKind::WrongArity,
                        format!(
                            "'{}' called with wrong arity: expected {}, got {arg_count}",
                            usage.export,
                            signature.arity_label()
                        ),
                        &version,
                        authority,
                    ));
                    continue;
                }
            }
            if !site.arg_names.is_empty() && !signature.params.is_empty() {
                if let Some(unknown) = site
                    .arg_names
                    .iter()
                    .find(|name| !signature.params.iter().any(|p| &p.name == *name))
                {
                    findings.push(build_at(
                        file,
                        usage,
                        site,
                        FindingKind::WrongParam,
                        format!(
                            "'{}' has no parameter '{unknown}' in {} {version}",
                            usage.export, usage.package
                        ),
                        &version,
                        authority,
                    ));
                }
            }
        }
    }

    findings
}

#[allow(clippy::too_many_arguments)]
fn build(
    file: &str,
    usage: &SymbolUsage,
    site: &UsageSite,
    kind: FindingKind,
    message: String,
    version: &Version,
    authority: &AuthorityStore,
    resolved: Option<&ResolvedApiSpec>,
) -> Finding {
    let mut finding = build_at(file, usage, site, kind, message, version, authority);
    // Fix suggestions come from the deprecation's replacement when the
    // authority data carries one.
    if let Some(replacement) = resolved
        .and_then(|r| r.active_deprecation.as_ref())
        .and_then(|d| d.replacement.as_ref())
    {
        let mut description = format!("Use {}/{}", replacement.package, replacement.export);
        let mut reference_url = None;
        if let Some(hint) = &replacement.migration_hint {
            if hint.starts_with("http://") || hint.starts_with("https://") {
                reference_url = Some(hint.clone());
            } else {
                description.push_str(": ");
                description.push_str(hint);
            }
        }
        finding.fixes.push(FixSuggestion {
            description,
            reference_url,
        });
    }
    finding
}

fn build_at(
    file: &str,
    usage: &SymbolUsage,
    site: &UsageSite,
    kind: FindingKind,
    message: String,
    version: &Version,
    authority: &AuthorityStore,
) -> Finding {
    let long_id = make_long_id(
        &usage.package,
        &usage.export,
        file,
        site.location.line,
        site.location.column,
    );
    Finding {
        id: short_id(&long_id),
        long_id,
        kind,
        severity: kind.severity(),
        location: Location::new(file, site.location.line, site.location.column),
        message,
        symbol: SymbolRef {
            package: usage.package.clone(),
            export: usage.export.clone(),
            installed_version: Some(version.to_string()),
        },
        fixes: Vec::new(),
        authority: AuthorityRef {
            data_version: authority.data_version().to_string(),
            spec_key: format!("{}/{}", usage.package, usage.export),
        },
        suppressed: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::schema::{
        ApiKind, ApiSpec, DeprecationEntry, ParamSpec, ReplacementRef, SignatureSpec,
    };
    use crate::context::RepoContext;
    use crate::parse::{LightweightParser, SourceParser};
    use crate::resolver::{resolve_imports, AdapterRegistry};
    use crate::version::VersionRange;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn react_authority() -> AuthorityStore {
        let specs = vec![
            ApiSpec {
                package: "react".into(),
                export: "useState".into(),
                kind: ApiKind::Hook,
                available_in: VersionRange::parse(">=16.8.0").unwrap(),
                signatures: vec![SignatureSpec {
                    since: Version::new(16, 8, 0),
                    until: None,
                    min_arity: 0,
                    max_arity: Some(1),
                    params: vec![ParamSpec {
                        name: "initialState".into(),
                        required: false,
                    }],
                }],
                deprecations: vec![],
            },
            ApiSpec {
                package: "react".into(),
                export: "useId".into(),
                kind: ApiKind::Hook,
                available_in: VersionRange::parse(">=18.0.0").unwrap(),
                signatures: vec![SignatureSpec {
                    since: Version::new(18, 0, 0),
                    until: None,
                    min_arity: 0,
                    max_arity: Some(0),
                    params: vec![],
                }],
                deprecations: vec![],
            },
            ApiSpec {
                package: "react".into(),
                export: "createFactory".into(),
                kind: ApiKind::Function,
                available_in: VersionRange::parse(">=0.14.0 <19.0.0").unwrap(),
                signatures: vec![SignatureSpec {
                    since: Version::new(0, 14, 0),
                    until: None,
                    min_arity: 1,
                    max_arity: Some(1),
                    params: vec![],
                }],
                deprecations: vec![DeprecationEntry {
                    since: Version::new(16, 13, 0),
                    removed_in: Some(Version::new(19, 0, 0)),
                    message: "createFactory is deprecated".into(),
                    replacement: Some(ReplacementRef {
                        package: "react".into(),
                        export: "createElement".into(),
                        migration_hint: Some("https://react.dev/reference/react/createElement".into()),
                    }),
                }],
            },
        ];
        AuthorityStore::from_specs("2.1.0", specs)
    }

    fn ctx_at(version: &str) -> RepoContext {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            format!(r#"{{ "dependencies": {{ "react": "{version}" }} }}"#),
        )
        .unwrap();
        RepoContext::build(dir.path(), &BTreeMap::new()).unwrap()
    }

    fn analyze(source: &str, version: &str) -> Vec<Finding> {
        let ast = LightweightParser::new()
            .parse(&PathBuf::from("src/app.tsx"), source)
            .unwrap();
        let resolved = resolve_imports(&ast, None, &AdapterRegistry::empty(), &BTreeMap::new());
        analyze_file(
            "src/app.tsx",
            &resolved.usages,
            &ctx_at(version),
            &react_authority(),
        )
    }

    #[test]
    fn test_clean_usage_no_findings() {
        let findings = analyze(
            "import { useState } from 'react';\nconst [n, setN] = useState(0);\n",
            "18.2.0",
        );
        assert!(findings.is_empty(), "unexpected: {findings:?}");
    }

    #[test]
    fn test_deprecated_api_warning() {
        let findings = analyze(
            "import { createFactory } from 'react';\nconst f = createFactory('div');\n",
            "18.2.0",
        );
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.kind, FindingKind::DeprecatedApi);
        assert_eq!(f.severity, crate::models::Severity::Warning);
        assert_eq!(f.location.line, 2);
        assert!(f.message.contains("16.13.0"));
        assert!(f.message.contains("createElement"));
        assert_eq!(
            f.fixes[0].reference_url.as_deref(),
            Some("https://react.dev/reference/react/createElement")
        );
        assert_eq!(f.symbol.installed_version.as_deref(), Some("18.2.0"));
    }

    #[test]
    fn test_removed_api_error() {
        let findings = analyze(
            "import { createFactory } from 'react';\nconst f = createFactory('div');\n",
            "19.0.0",
        );
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.kind, FindingKind::RemovedApi);
        assert_eq!(f.severity, crate::models::Severity::Error);
        assert!(f.message.contains("19.0.0"));
        assert!(f.message.contains("createElement"));
    }

    #[test]
    fn test_future_api_error() {
        let findings = analyze(
            "import { useId } from 'react';\nconst id = useId();\n",
            "17.0.2",
        );
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.kind, FindingKind::FutureApi);
        assert!(f.message.contains("18.0.0"));
    }

    #[test]
    fn test_wrong_arity_error() {
        let findings = analyze(
            "import { useState } from 'react';\nconst [n] = useState(0, \"extra\");\n",
            "18.2.0",
        );
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.kind, FindingKind::WrongArity);
        assert!(f.message.contains("expected 0\u{2013}1, got 2"), "{}", f.message);
    }

    #[test]
    fn test_zero_args_within_arity_is_clean() {
        let findings = analyze(
            "import { useState } from 'react';\nconst [n, setN] = useState();\n",
            "18.2.0",
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_unknown_export_info() {
        let findings = analyze(
            "import { useFancyState } from 'react';\nuseFancyState(1);\n",
            "18.2.0",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::UnknownExport);
        assert_eq!(findings[0].severity, crate::models::Severity::Info);
    }

    #[test]
    fn test_unknown_package_skipped() {
        let ast = LightweightParser::new()
            .parse(
                &PathBuf::from("a.ts"),
                "import { map } from 'lodash';\nmap(xs, f);\n",
            )
            .unwrap();
        let resolved = resolve_imports(&ast, None, &AdapterRegistry::empty(), &BTreeMap::new());
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{ "dependencies": { "lodash": "4.17.21" } }"#,
        )
        .unwrap();
        let ctx = RepoContext::build(dir.path(), &BTreeMap::new()).unwrap();
        let findings = analyze_file("a.ts", &resolved.usages, &ctx, &react_authority());
        assert!(findings.is_empty());
    }

    #[test]
    fn test_import_only_removed_symbol_still_reported() {
        let findings = analyze("import { createFactory } from 'react';\n", "19.0.0");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::RemovedApi);
        assert_eq!(findings[0].location.line, 1);
    }

    #[test]
    fn test_state_rules_once_per_usage_arity_per_site() {
        // Two bad-arity calls: two findings. Two deprecated calls: one.
        let arity = analyze(
            "import { useState } from 'react';\nuseState(1, 2);\nuseState(3, 4);\n",
            "18.2.0",
        );
        assert_eq!(arity.len(), 2);
        assert!(arity.iter().all(|f| f.kind == FindingKind::WrongArity));

        let deprecated = analyze(
            "import { createFactory } from 'react';\ncreateFactory('a');\ncreateFactory('b');\n",
            "18.2.0",
        );
        assert_eq!(deprecated.len(), 1);
    }

    #[test]
    fn test_deprecation_wins_over_arity() {
        // First matching rule per usage: a deprecated symbol called with
        // wrong arity reports the deprecation only.
        let findings = analyze(
            "import { createFactory } from 'react';\ncreateFactory('a', 'b', 'c');\n",
            "18.2.0",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::DeprecatedApi);
    }

    #[test]
    fn test_range_fallback_without_lockfile() {
        // "^18.2.0" has no lockfile behind it in ctx_at; analysis uses the
        // coerced range edge.
        let findings = analyze(
            "import { useId } from 'react';\nuseId();\n",
            "^18.2.0",
        );
        assert!(findings.is_empty());

        let findings = analyze(
            "import { useId } from 'react';\nuseId();\n",
            "^17.0.0",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::FutureApi);
    }

    #[test]
    fn test_long_and_short_ids() {
        let findings = analyze(
            "import { createFactory } from 'react';\ncreateFactory('div');\n",
            "18.2.0",
        );
        let f = &findings[0];
        assert_eq!(
            f.long_id,
            format!(
                "dxy:react/createFactory:src/app.tsx:{}:{}",
                f.location.line, f.location.column
            )
        );
        assert_eq!(f.id, short_id(&f.long_id));
        let (pkg, exp, file, _, _) = crate::models::parse_long_id(&f.long_id).unwrap();
        assert_eq!(pkg, "react");
        assert_eq!(exp, "createFactory");
        assert_eq!(file, "src/app.tsx");
    }
}
