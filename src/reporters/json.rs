//! Machine-readable JSON reporter

use crate::models::{Finding, FindingsSummary};
use crate::pipeline::RunResult;
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    findings: Vec<&'a Finding>,
    summary: &'a FindingsSummary,
    stats: JsonStats,
}

#[derive(Serialize)]
struct JsonStats {
    analyzed: usize,
    cached: usize,
    candidates: usize,
    renames_migrated: usize,
    duration_ms: u64,
    git_available: bool,
}

pub struct JsonReporter;

impl JsonReporter {
    pub fn render(&self, result: &RunResult, findings: &[&Finding]) -> Result<String> {
        let report = JsonReport {
            version: env!("CARGO_PKG_VERSION"),
            findings: findings.to_vec(),
            summary: &result.summary,
            stats: JsonStats {
                analyzed: result.stats.to_analyze,
                cached: result.stats.from_cache,
                candidates: result.stats.candidates,
                renames_migrated: result.stats.renames_migrated,
                duration_ms: result.duration_ms,
                git_available: result.git_available,
            },
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incremental::{PlanStats, RunMode};
    use crate::models::{AuthorityRef, FindingKind, Location, Severity, SymbolRef};

    #[test]
    fn test_json_is_valid_and_carries_ids() {
        let long_id = crate::models::make_long_id("react", "useId", "a.ts", 1, 1);
        let finding = Finding {
            id: crate::models::short_id(&long_id),
            long_id: long_id.clone(),
            kind: FindingKind::FutureApi,
            severity: Severity::Error,
            location: Location::new("a.ts", 1, 1),
            message: "m".into(),
            symbol: SymbolRef::default(),
            fixes: vec![],
            authority: AuthorityRef::default(),
            suppressed: None,
        };
        let result = RunResult {
            summary: FindingsSummary::from_findings(std::slice::from_ref(&finding)),
            findings: vec![finding],
            mode: RunMode::Full,
            git_available: true,
            stats: PlanStats {
                candidates: 1,
                to_analyze: 1,
                from_cache: 0,
                renames_migrated: 0,
            },
            duration_ms: 5,
            severity_floor: Severity::Info,
            fail_on: Severity::Error,
        };
        let refs: Vec<&Finding> = result.findings.iter().collect();
        let json = JsonReporter.render(&result, &refs).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["findings"][0]["long_id"], long_id);
        assert_eq!(value["findings"][0]["kind"], "future-api");
        assert_eq!(value["stats"]["analyzed"], 1);
    }
}
