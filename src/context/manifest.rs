//! package.json parsing
//!
//! Only the fields doxy cares about: the declared dependency ranges across
//! the three dependency tables. Values are kept as raw JSON values because
//! real-world manifests occasionally hold non-string entries there.

use crate::error::DoxyError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PackageJson {
    pub name: Option<String>,
    pub dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(rename = "peerDependencies")]
    pub peer_dependencies: BTreeMap<String, serde_json::Value>,
}

impl PackageJson {
    /// Declared `(package, range)` pairs, runtime tables taking precedence
    /// over dev over peer when a name appears in more than one.
    pub fn declared_ranges(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for table in [
            &self.peer_dependencies,
            &self.dev_dependencies,
            &self.dependencies,
        ] {
            for (name, value) in table {
                if let Some(range) = value.as_str() {
                    out.insert(name.clone(), range.to_string());
                }
            }
        }
        out
    }
}

/// Load the project manifest. A missing or unparsable manifest is a project
/// error: without it there is nothing to resolve versions against.
pub fn load(root: &Path) -> Result<PackageJson, DoxyError> {
    let path = root.join("package.json");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| DoxyError::Project(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| DoxyError::Project(format!("cannot parse {}: {e}", path.display())))
}
