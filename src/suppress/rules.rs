//! Config suppression rules and the baseline file
//!
//! Rules come from project configuration; each may constrain package,
//! export, kind, and paths, all optional. Package and export accept globs
//! or exact names. The baseline is a recorded set of long finding ids that
//! are accepted as pre-existing debt.

use crate::error::DoxyError;
use crate::models::{Finding, FindingKind};
use chrono::Utc;
use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// A suppression rule as written in configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SuppressionRule {
    pub package: Option<String>,
    pub export: Option<String>,
    /// One of the six kinds or `*` (the default).
    pub kind: Option<String>,
    pub paths: Option<Vec<String>>,
    pub reason: Option<String>,
}

/// A rule with its patterns compiled, ready for matching.
#[derive(Debug)]
pub struct CompiledRule {
    package: Option<GlobMatcher>,
    export: Option<GlobMatcher>,
    kind: Option<FindingKind>,
    paths: Vec<GlobMatcher>,
    pub reason: Option<String>,
}

impl CompiledRule {
    pub fn compile(rule: &SuppressionRule) -> Result<Self, DoxyError> {
        let compile_glob = |pattern: &str| -> Result<GlobMatcher, DoxyError> {
            Glob::new(pattern)
                .map(|g| g.compile_matcher())
                .map_err(|e| {
                    DoxyError::Config(format!("invalid suppression glob '{pattern}': {e}"))
                })
        };

        let kind = match rule.kind.as_deref() {
            None | Some("*") => None,
            Some(raw) => Some(FindingKind::parse(raw).ok_or_else(|| {
                DoxyError::Config(format!("unknown suppression kind '{raw}'"))
            })?),
        };

        Ok(Self {
            package: rule.package.as_deref().map(compile_glob).transpose()?,
            export: rule.export.as_deref().map(compile_glob).transpose()?,
            kind,
            paths: rule
                .paths
                .iter()
                .flatten()
                .map(|p| compile_glob(p))
                .collect::<Result<_, _>>()?,
            reason: rule.reason.clone(),
        })
    }

    pub fn matches(&self, finding: &Finding) -> bool {
        if let Some(kind) = self.kind {
            if finding.kind != kind {
                return false;
            }
        }
        if let Some(package) = &self.package {
            if !package.is_match(&finding.symbol.package) {
                return false;
            }
        }
        if let Some(export) = &self.export {
            if !export.is_match(&finding.symbol.export) {
                return false;
            }
        }
        if !self.paths.is_empty() && !self.paths.iter().any(|p| p.is_match(&finding.location.file))
        {
            return false;
        }
        true
    }
}

/// Compile all configured rules, failing on the first invalid one.
pub fn compile_rules(rules: &[SuppressionRule]) -> Result<Vec<CompiledRule>, DoxyError> {
    rules.iter().map(CompiledRule::compile).collect()
}

/// Accepted pre-existing findings, stored at `.doxy/baseline.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub finding_ids: BTreeSet<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub doxy_version: String,
}

impl Baseline {
    pub fn path(root: &Path) -> std::path::PathBuf {
        root.join(".doxy").join("baseline.json")
    }

    pub fn from_findings<'a>(findings: impl Iterator<Item = &'a Finding>) -> Self {
        Self {
            finding_ids: findings.map(|f| f.long_id.clone()).collect(),
            created_at: Utc::now().to_rfc3339(),
            doxy_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Load the baseline if one exists. A malformed baseline is a config
    /// error rather than silently dropping accepted debt.
    pub fn load(root: &Path) -> Result<Option<Self>, DoxyError> {
        let path = Self::path(root);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| DoxyError::Config(format!("cannot read {}: {e}", path.display())))?;
        let baseline: Baseline = serde_json::from_str(&content)
            .map_err(|e| DoxyError::Config(format!("cannot parse {}: {e}", path.display())))?;
        debug!("loaded baseline with {} findings", baseline.finding_ids.len());
        Ok(Some(baseline))
    }

    pub fn save(&self, root: &Path) -> Result<(), DoxyError> {
        let path = Self::path(root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DoxyError::Config(format!("cannot create {}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string_pretty(self).expect("baseline serializes");
        std::fs::write(&path, json)
            .map_err(|e| DoxyError::Config(format!("cannot write {}: {e}", path.display())))?;
        Ok(())
    }

    pub fn contains(&self, long_id: &str) -> bool {
        self.finding_ids.contains(long_id)
    }
}
