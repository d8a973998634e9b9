//! Layered suppression engine
//!
//! Findings pass through three layers in order: inline directives, config
//! rules, then the baseline. The first matching layer marks the finding
//! with its source and reason. Suppressed findings are excluded from output
//! and exit-code evaluation but still written to the cache; when a cached
//! finding is served again, the config-rule and baseline layers are
//! re-judged against the current rules so suppression edits take effect
//! without re-analysis. Only the inline layer is trusted from the cache:
//! its directives live in the file, and any edit to them changes the
//! content hash and forces re-analysis anyway.

pub mod inline;
pub mod rules;

use crate::models::{Finding, SuppressionInfo, SuppressionSource};
use tracing::debug;

pub use inline::{parse_inline, InlineSuppression, KindFilter};
pub use rules::{compile_rules, Baseline, CompiledRule, SuppressionRule};

/// Mark suppressed findings in place. Internal-error findings are exempt:
/// they report doxy's own limits, not the project's API usage.
pub fn apply_suppressions(
    findings: &mut [Finding],
    inline: &[InlineSuppression],
    config_rules: &[CompiledRule],
    baseline: Option<&Baseline>,
) {
    let mut suppressed = 0usize;
    for finding in findings.iter_mut() {
        if finding.kind == crate::models::FindingKind::InternalError {
            continue;
        }

        if let Some(hit) = inline::find_match(inline, finding.location.line, finding.kind) {
            finding.suppressed = Some(SuppressionInfo {
                source: SuppressionSource::Inline,
                reason: hit.reason.clone(),
            });
            suppressed += 1;
            continue;
        }

        if let Some(rule) = config_rules.iter().find(|r| r.matches(finding)) {
            finding.suppressed = Some(SuppressionInfo {
                source: SuppressionSource::Config,
                reason: rule.reason.clone(),
            });
            suppressed += 1;
            continue;
        }

        if let Some(baseline) = baseline {
            if baseline.contains(&finding.long_id) {
                finding.suppressed = Some(SuppressionInfo {
                    source: SuppressionSource::Baseline,
                    reason: None,
                });
                suppressed += 1;
            }
        }
    }
    if suppressed > 0 {
        debug!("suppressed {suppressed} findings");
    }
}

/// Re-judge config-rule and baseline suppression for findings served from
/// the cache. Stored config and baseline markers reflect the rules as of
/// analysis time and are discarded; inline markers are kept (the content
/// hash gates them).
pub fn refresh_suppressions(
    findings: &mut [Finding],
    config_rules: &[CompiledRule],
    baseline: Option<&Baseline>,
) {
    for finding in findings.iter_mut() {
        if finding.kind == crate::models::FindingKind::InternalError {
            continue;
        }
        if matches!(
            &finding.suppressed,
            Some(info) if info.source == SuppressionSource::Inline
        ) {
            continue;
        }
        finding.suppressed = None;

        if let Some(rule) = config_rules.iter().find(|r| r.matches(finding)) {
            finding.suppressed = Some(SuppressionInfo {
                source: SuppressionSource::Config,
                reason: rule.reason.clone(),
            });
            continue;
        }
        if let Some(baseline) = baseline {
            if baseline.contains(&finding.long_id) {
                finding.suppressed = Some(SuppressionInfo {
                    source: SuppressionSource::Baseline,
                    reason: None,
                });
            }
        }
    }
}
