//! SARIF 2.1.0 reporter for code-scanning integrations
//!
//! Reference: https://docs.oasis-open.org/sarif/sarif/v2.1.0/sarif-v2.1.0.html

use crate::models::{Finding, FindingKind, Severity};
use anyhow::Result;
use serde::Serialize;

const SARIF_SCHEMA: &str =
    "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const SARIF_VERSION: &str = "2.1.0";

fn severity_to_sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

const ALL_KINDS: [FindingKind; 7] = [
    FindingKind::DeprecatedApi,
    FindingKind::RemovedApi,
    FindingKind::FutureApi,
    FindingKind::WrongArity,
    FindingKind::WrongParam,
    FindingKind::UnknownExport,
    FindingKind::InternalError,
];

fn kind_description(kind: FindingKind) -> &'static str {
    match kind {
        FindingKind::DeprecatedApi => "Symbol is deprecated at the installed version",
        FindingKind::RemovedApi => "Symbol was removed before the installed version",
        FindingKind::FutureApi => "Symbol is not yet introduced at the installed version",
        FindingKind::WrongArity => "Call has an argument count outside the active signature",
        FindingKind::WrongParam => "Call passes a parameter the active signature does not declare",
        FindingKind::UnknownExport => "Export is unknown to the authority data",
        FindingKind::InternalError => "Doxy could not analyze this file",
    }
}

// ----------------------------------------------------------------------------
// SARIF data structures
// ----------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifReport {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<SarifRun>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifDriver {
    name: &'static str,
    version: &'static str,
    information_uri: &'static str,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRule {
    id: String,
    name: String,
    short_description: SarifMessage,
    default_configuration: SarifConfiguration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifConfiguration {
    level: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifMessage {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    level: &'static str,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
    /// The long id; stable across runs for result matching.
    fingerprints: SarifFingerprints,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifFingerprints {
    #[serde(rename = "doxy/v1")]
    doxy: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifPhysicalLocation {
    artifact_location: SarifArtifactLocation,
    region: SarifRegion,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRegion {
    start_line: u32,
    start_column: u32,
}

pub struct SarifReporter;

impl SarifReporter {
    pub fn render(&self, findings: &[&Finding]) -> Result<String> {
        let rules = ALL_KINDS
            .iter()
            .map(|kind| SarifRule {
                id: kind.to_string(),
                name: kind.to_string(),
                short_description: SarifMessage {
                    text: kind_description(*kind).to_string(),
                },
                default_configuration: SarifConfiguration {
                    level: severity_to_sarif_level(kind.severity()),
                },
            })
            .collect();

        let results = findings
            .iter()
            .map(|finding| SarifResult {
                rule_id: finding.kind.to_string(),
                level: severity_to_sarif_level(finding.severity),
                message: SarifMessage {
                    text: finding.message.clone(),
                },
                locations: vec![SarifLocation {
                    physical_location: SarifPhysicalLocation {
                        artifact_location: SarifArtifactLocation {
                            uri: finding.location.file.clone(),
                        },
                        region: SarifRegion {
                            start_line: finding.location.line.max(1),
                            start_column: finding.location.column.max(1),
                        },
                    },
                }],
                fingerprints: SarifFingerprints {
                    doxy: finding.long_id.clone(),
                },
            })
            .collect();

        let report = SarifReport {
            schema: SARIF_SCHEMA,
            version: SARIF_VERSION,
            runs: vec![SarifRun {
                tool: SarifTool {
                    driver: SarifDriver {
                        name: "doxy",
                        version: env!("CARGO_PKG_VERSION"),
                        information_uri: "https://github.com/doxy-dev/doxy",
                        rules,
                    },
                },
                results,
            }],
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthorityRef, Location, SymbolRef};

    #[test]
    fn test_sarif_shape() {
        let long_id = crate::models::make_long_id("react", "createFactory", "src/a.tsx", 2, 3);
        let finding = Finding {
            id: crate::models::short_id(&long_id),
            long_id: long_id.clone(),
            kind: FindingKind::RemovedApi,
            severity: Severity::Error,
            location: Location::new("src/a.tsx", 2, 3),
            message: "'createFactory' was removed".into(),
            symbol: SymbolRef::default(),
            fixes: vec![],
            authority: AuthorityRef::default(),
            suppressed: None,
        };
        let json = SarifReporter.render(&[&finding]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], "2.1.0");
        assert_eq!(value["runs"][0]["tool"]["driver"]["name"], "doxy");
        let result = &value["runs"][0]["results"][0];
        assert_eq!(result["ruleId"], "removed-api");
        assert_eq!(result["level"], "error");
        assert_eq!(
            result["locations"][0]["physicalLocation"]["region"]["startLine"],
            2
        );
        assert_eq!(result["fingerprints"]["doxy/v1"], long_id);
        // One rule per kind is declared.
        assert_eq!(
            value["runs"][0]["tool"]["driver"]["rules"]
                .as_array()
                .unwrap()
                .len(),
            7
        );
    }
}
