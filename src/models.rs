//! Core data models for doxy
//!
//! Findings, their kinds and severities, and the stable identifier scheme
//! shared by the analyzer, cache, baseline, and reporters.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The classification of a single incompatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    /// Symbol carries an active deprecation at the installed version.
    DeprecatedApi,
    /// Symbol existed in an earlier version but is gone at the installed one.
    RemovedApi,
    /// Symbol is introduced only in a later version than the installed one.
    FutureApi,
    /// Call-site argument count falls outside the active signature's arity.
    WrongArity,
    /// A named argument does not exist in the active signature.
    WrongParam,
    /// The authority data does not know this export at all.
    UnknownExport,
    /// Per-file analysis failure (parser crash, timeout); never fatal.
    InternalError,
}

impl FindingKind {
    /// Severity is fixed per kind, not configurable.
    pub fn severity(self) -> Severity {
        match self {
            FindingKind::RemovedApi
            | FindingKind::FutureApi
            | FindingKind::WrongArity
            | FindingKind::WrongParam => Severity::Error,
            FindingKind::DeprecatedApi => Severity::Warning,
            FindingKind::UnknownExport | FindingKind::InternalError => Severity::Info,
        }
    }

    /// The kinds recognized by suppression directives (`internal-error`
    /// findings cannot be suppressed).
    pub const SUPPRESSIBLE: [FindingKind; 6] = [
        FindingKind::DeprecatedApi,
        FindingKind::RemovedApi,
        FindingKind::FutureApi,
        FindingKind::WrongArity,
        FindingKind::WrongParam,
        FindingKind::UnknownExport,
    ];

    pub fn parse(s: &str) -> Option<FindingKind> {
        match s {
            "deprecated-api" => Some(FindingKind::DeprecatedApi),
            "removed-api" => Some(FindingKind::RemovedApi),
            "future-api" => Some(FindingKind::FutureApi),
            "wrong-arity" => Some(FindingKind::WrongArity),
            "wrong-param" => Some(FindingKind::WrongParam),
            "unknown-export" => Some(FindingKind::UnknownExport),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FindingKind::DeprecatedApi => "deprecated-api",
            FindingKind::RemovedApi => "removed-api",
            FindingKind::FutureApi => "future-api",
            FindingKind::WrongArity => "wrong-arity",
            FindingKind::WrongParam => "wrong-param",
            FindingKind::UnknownExport => "unknown-export",
            FindingKind::InternalError => "internal-error",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity levels for findings, ordered lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// A position in a source file (1-indexed line and column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

/// The symbol a finding is about, pinned to the version it was checked at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SymbolRef {
    pub package: String,
    pub export: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
}

/// A suggested remediation, ordered most-preferred first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixSuggestion {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
}

/// Which suppression layer hid a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionSource {
    Inline,
    Config,
    Baseline,
}

/// Attached to a finding when a suppression layer matched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionInfo {
    pub source: SuppressionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Reference back into the authority dataset a finding was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AuthorityRef {
    pub data_version: String,
    /// `package/export` key of the spec that produced the finding.
    pub spec_key: String,
}

/// A single reported incompatibility.
///
/// The long id is the portable handle (stable across hash-prefix
/// collisions); the short id is a display shortcut derived from it. Once a
/// finding is emitted into the merged result set it is immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub long_id: String,
    pub kind: FindingKind,
    pub severity: Severity,
    pub location: Location,
    pub message: String,
    pub symbol: SymbolRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixes: Vec<FixSuggestion>,
    #[serde(default)]
    pub authority: AuthorityRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppressed: Option<SuppressionInfo>,
}

impl Finding {
    pub fn is_suppressed(&self) -> bool {
        self.suppressed.is_some()
    }
}

/// Build the canonical long identifier for a finding.
///
/// Format: `dxy:<package>/<export>:<file>:<line>:<col>`. Neither package
/// names nor export names contain `:`, so the symbol segment is
/// unambiguous; the trailing line/col are parsed from the right to tolerate
/// `:` in file paths.
pub fn make_long_id(package: &str, export: &str, file: &str, line: u32, col: u32) -> String {
    format!("dxy:{package}/{export}:{file}:{line}:{col}")
}

/// Parse a long identifier back into its components.
pub fn parse_long_id(long_id: &str) -> Option<(String, String, String, u32, u32)> {
    let rest = long_id.strip_prefix("dxy:")?;
    let (symbol, rest) = rest.split_once(':')?;

    let mut tail = rest.rsplitn(3, ':');
    let col: u32 = tail.next()?.parse().ok()?;
    let line: u32 = tail.next()?.parse().ok()?;
    let file = tail.next()?.to_string();

    // Scoped packages occupy the first two slash-delimited segments.
    let (package, export) = if symbol.starts_with('@') {
        let second_slash = symbol.match_indices('/').nth(1).map(|(i, _)| i)?;
        (
            symbol[..second_slash].to_string(),
            symbol[second_slash + 1..].to_string(),
        )
    } else {
        let (pkg, exp) = symbol.split_once('/')?;
        (pkg.to_string(), exp.to_string())
    };

    if export.is_empty() || file.is_empty() {
        return None;
    }
    Some((package, export, file, line, col))
}

/// Derive the short display id from a long id.
///
/// `dxy_` + the first 8 hex chars of the SHA-256 of the long id. Accepted
/// externally alongside the long form, but only the long form is collision
/// free.
pub fn short_id(long_id: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(long_id.as_bytes()));
    format!("dxy_{}", &digest[..8])
}

/// Summary of findings by severity, for reporters and exit-code evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub suppressed: usize,
    pub total: usize,
}

impl FindingsSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for f in findings {
            if f.is_suppressed() {
                summary.suppressed += 1;
                continue;
            }
            match f.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
            }
            summary.total += 1;
        }
        summary
    }

    /// Whether any visible finding is at or above the threshold.
    pub fn any_at_or_above(&self, threshold: Severity) -> bool {
        match threshold {
            Severity::Error => self.errors > 0,
            Severity::Warning => self.errors + self.warnings > 0,
            Severity::Info => self.total > 0,
        }
    }
}
