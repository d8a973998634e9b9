//! Project-level configuration
//!
//! Loaded from `doxy.toml` or `.doxyrc.json` in the project root, first hit
//! wins. Every field has a default so a project with no config file gets
//! sensible behavior. Option names match the on-disk JSON convention
//! (`failOn`, `pathAliases`) in both formats.
//!
//! ```toml
//! # doxy.toml
//! include = ["src/**"]
//! exclude = ["**/*.test.*"]
//! failOn = "error"
//!
//! [pathAliases]
//! "@app/*" = "./src/*"
//!
//! [[suppressions]]
//! package = "react"
//! kind = "deprecated-api"
//! reason = "migration tracked in #142"
//! ```

use crate::error::DoxyError;
use crate::models::Severity;
use crate::suppress::SuppressionRule;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct DoxyConfig {
    /// Globs of files to analyze; empty means every supported file.
    pub include: Vec<String>,
    /// Globs of files to skip.
    pub exclude: Vec<String>,
    /// Minimum severity surfaced in output.
    pub severity: Option<Severity>,
    /// Minimum severity that drives a nonzero exit. Default: error.
    pub fail_on: Option<Severity>,
    /// Manual framework version overrides, id to semver.
    pub frameworks: BTreeMap<String, String>,
    /// Import-source prefix rewrites applied before resolution.
    pub path_aliases: BTreeMap<String, String>,
    /// Config-level suppression rules.
    pub suppressions: Vec<SuppressionRule>,
    /// Treat suppressions without a reason as a configuration error.
    pub require_suppression_reason: bool,
    /// Ordered authority dataset roots, relative to the project root.
    /// First hit wins on key collisions.
    pub authority_data_sources: Vec<String>,
}

impl DoxyConfig {
    /// Load from the project root; a missing file yields defaults, an
    /// unreadable or invalid one is a configuration error.
    pub fn load(root: &Path) -> Result<Self, DoxyError> {
        let toml_path = root.join("doxy.toml");
        if toml_path.exists() {
            let content = std::fs::read_to_string(&toml_path).map_err(|e| {
                DoxyError::Config(format!("cannot read {}: {e}", toml_path.display()))
            })?;
            let config: DoxyConfig = toml::from_str(&content).map_err(|e| {
                DoxyError::Config(format!("cannot parse {}: {e}", toml_path.display()))
            })?;
            debug!("loaded {}", toml_path.display());
            return config.validated();
        }

        let json_path = root.join(".doxyrc.json");
        if json_path.exists() {
            let content = std::fs::read_to_string(&json_path).map_err(|e| {
                DoxyError::Config(format!("cannot read {}: {e}", json_path.display()))
            })?;
            let config: DoxyConfig = serde_json::from_str(&content).map_err(|e| {
                DoxyError::Config(format!("cannot parse {}: {e}", json_path.display()))
            })?;
            debug!("loaded {}", json_path.display());
            return config.validated();
        }

        Ok(Self::default())
    }

    fn validated(self) -> Result<Self, DoxyError> {
        if self.require_suppression_reason {
            if let Some(rule) = self.suppressions.iter().find(|r| {
                r.reason
                    .as_deref()
                    .map(|r| r.trim().is_empty())
                    .unwrap_or(true)
            }) {
                return Err(DoxyError::Config(format!(
                    "requireSuppressionReason is set but a suppression rule (package: {:?}, kind: {:?}) has no reason",
                    rule.package, rule.kind
                )));
            }
        }
        Ok(self)
    }

    pub fn severity_floor(&self) -> Severity {
        self.severity.unwrap_or(Severity::Info)
    }

    pub fn fail_on(&self) -> Severity {
        self.fail_on.unwrap_or(Severity::Error)
    }

    /// Authority roots to load, resolved against the project root.
    /// `override_dir` (from the CLI) takes precedence over configuration;
    /// the fallback is `.doxy/authority`.
    pub fn authority_roots(&self, root: &Path, override_dir: Option<&Path>) -> Vec<PathBuf> {
        if let Some(dir) = override_dir {
            return vec![dir.to_path_buf()];
        }
        if !self.authority_data_sources.is_empty() {
            return self
                .authority_data_sources
                .iter()
                .map(|s| {
                    let p = PathBuf::from(s);
                    if p.is_absolute() {
                        p
                    } else {
                        root.join(p)
                    }
                })
                .collect();
        }
        vec![root.join(".doxy").join("authority")]
    }
}
