//! Framework detection
//!
//! Detects which UI frameworks a project uses and at what version, so the
//! matching import-normalization adapters can be activated. Confidence
//! records where the version came from: an exact lockfile resolution, the
//! declared manifest range, or inference from a related package.

use super::DependencyInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// How trustworthy a detected framework version is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Lockfile,
    Manifest,
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedFramework {
    pub id: String,
    pub name: String,
    pub version: String,
    pub confidence: Confidence,
}

/// Frameworks doxy knows adapters for: `(id, display name, marker package,
/// packages whose presence implies it)`.
const KNOWN: &[(&str, &str, &str, &[&str])] = &[
    ("react", "React", "react", &["react-dom", "next"]),
    ("next", "Next.js", "next", &[]),
    ("vue", "Vue", "vue", &["nuxt"]),
    ("angular", "Angular", "@angular/core", &[]),
];

/// Detect frameworks from the dependency map, applying manual version
/// overrides from configuration. Result is sorted by id (the order feeds
/// the context hash).
pub fn detect(
    dependencies: &BTreeMap<String, DependencyInfo>,
    overrides: &BTreeMap<String, String>,
) -> Vec<DetectedFramework> {
    let mut detected = Vec::new();

    for (id, name, marker, implied_by) in KNOWN {
        if let Some(version) = overrides.get(*id) {
            detected.push(DetectedFramework {
                id: id.to_string(),
                name: name.to_string(),
                version: version.clone(),
                confidence: Confidence::Manifest,
            });
            continue;
        }

        if let Some(info) = dependencies.get(*marker) {
            let (version, confidence) = match &info.resolved_version {
                Some(v) => (v.clone(), Confidence::Lockfile),
                None => (
                    info.declared_range.clone().unwrap_or_default(),
                    Confidence::Manifest,
                ),
            };
            if !version.is_empty() {
                detected.push(DetectedFramework {
                    id: id.to_string(),
                    name: name.to_string(),
                    version,
                    confidence,
                });
                continue;
            }
        }

        // Marker absent but a companion package is present: infer the
        // framework at the companion's version.
        for companion in *implied_by {
            if let Some(info) = dependencies.get(*companion) {
                let version = info
                    .resolved_version
                    .clone()
                    .or_else(|| info.declared_range.clone())
                    .unwrap_or_default();
                if !version.is_empty() {
                    detected.push(DetectedFramework {
                        id: id.to_string(),
                        name: name.to_string(),
                        version,
                        confidence: Confidence::Inferred,
                    });
                    break;
                }
            }
        }
    }

    detected.sort_by(|a, b| a.id.cmp(&b.id));
    debug!(
        "detected frameworks: {:?}",
        detected.iter().map(|f| f.id.as_str()).collect::<Vec<_>>()
    );
    detected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(declared: Option<&str>, resolved: Option<&str>) -> DependencyInfo {
        DependencyInfo {
            declared_range: declared.map(String::from),
            resolved_version: resolved.map(String::from),
        }
    }

    #[test]
    fn test_lockfile_confidence() {
        let mut deps = BTreeMap::new();
        deps.insert("react".to_string(), dep(Some("^18.2.0"), Some("18.2.0")));
        let detected = detect(&deps, &BTreeMap::new());
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].id, "react");
        assert_eq!(detected[0].version, "18.2.0");
        assert_eq!(detected[0].confidence, Confidence::Lockfile);
    }

    #[test]
    fn test_manifest_confidence_without_lockfile() {
        let mut deps = BTreeMap::new();
        deps.insert("react".to_string(), dep(Some("^18.2.0"), None));
        let detected = detect(&deps, &BTreeMap::new());
        assert_eq!(detected[0].confidence, Confidence::Manifest);
        assert_eq!(detected[0].version, "^18.2.0");
    }

    #[test]
    fn test_inferred_from_companion() {
        let mut deps = BTreeMap::new();
        deps.insert("react-dom".to_string(), dep(Some("^18.0.0"), Some("18.2.0")));
        let detected = detect(&deps, &BTreeMap::new());
        assert_eq!(detected[0].id, "react");
        assert_eq!(detected[0].confidence, Confidence::Inferred);
        assert_eq!(detected[0].version, "18.2.0");
    }

    #[test]
    fn test_override_wins() {
        let mut deps = BTreeMap::new();
        deps.insert("react".to_string(), dep(Some("^18.2.0"), Some("18.2.0")));
        let mut overrides = BTreeMap::new();
        overrides.insert("react".to_string(), "19.0.0".to_string());
        let detected = detect(&deps, &overrides);
        assert_eq!(detected[0].version, "19.0.0");
        assert_eq!(detected[0].confidence, Confidence::Manifest);
    }

    #[test]
    fn test_sorted_by_id() {
        let mut deps = BTreeMap::new();
        deps.insert("vue".to_string(), dep(Some("^3.4.0"), Some("3.4.0")));
        deps.insert("next".to_string(), dep(Some("14.1.0"), Some("14.1.0")));
        deps.insert("react".to_string(), dep(Some("^18.2.0"), Some("18.2.0")));
        let detected = detect(&deps, &BTreeMap::new());
        let ids: Vec<_> = detected.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["next", "react", "vue"]);
    }
}
