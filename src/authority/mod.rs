//! Version-indexed catalog of API specifications
//!
//! The authority store ingests a curated dataset (manifest plus one spec
//! file per package/major) and answers version-parameterized queries about
//! single symbols. Loading is all-or-nothing: any schema or validation
//! failure aborts with an authority error and no partial store. Queries
//! never fail; "unknown symbol" and "uncoercible version" are first-class
//! results.

pub mod schema;

use crate::error::DoxyError;
use crate::version::coerce_version;
use anyhow::Result;
use rustc_hash::FxHashMap;
use schema::{ApiSpec, DeprecationEntry, RawManifest, RawSpecFile, SignatureSpec};
use semver::Version;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// The answer to "what does this symbol mean at version v".
#[derive(Debug, Clone)]
pub struct ResolvedApiSpec {
    pub spec: Arc<ApiSpec>,
    /// The unique signature in force at the queried version, if any.
    pub active_signature: Option<SignatureSpec>,
    /// The most recent deprecation entry with `since <= v`. May be present
    /// even when `available` is false: that is how removal messages surface.
    pub active_deprecation: Option<DeprecationEntry>,
    /// Whether the queried version lies inside `availableIn`.
    pub available: bool,
    /// Not yet introduced: unavailable and below the range's lower bound.
    /// Mutually exclusive with `available`.
    pub is_future: bool,
}

/// Read-only store of validated API specs, shared across workers.
#[derive(Debug)]
pub struct AuthorityStore {
    specs: FxHashMap<(String, String), Arc<ApiSpec>>,
    packages: BTreeSet<String>,
    data_version: String,
    content_hash: String,
}

impl AuthorityStore {
    /// Load a store from one dataset root.
    pub fn load(root: &Path) -> Result<Self, DoxyError> {
        Self::load_sources(std::slice::from_ref(&root.to_path_buf()))
    }

    /// Load a store from ordered dataset roots; on `(package, export)` key
    /// collision the earliest source wins. The reported data version is the
    /// first source's.
    pub fn load_sources(roots: &[PathBuf]) -> Result<Self, DoxyError> {
        if roots.is_empty() {
            return Err(DoxyError::Authority(
                "no authority data sources configured".into(),
            ));
        }

        let mut specs: FxHashMap<(String, String), Arc<ApiSpec>> = FxHashMap::default();
        let mut packages = BTreeSet::new();
        let mut data_version: Option<String> = None;
        let mut hasher = Sha256::new();

        for root in roots {
            let manifest_path = root.join("manifest.json");
            let manifest_bytes = std::fs::read(&manifest_path).map_err(|e| {
                DoxyError::Authority(format!(
                    "cannot read {}: {e}",
                    manifest_path.display()
                ))
            })?;
            hasher.update(&manifest_bytes);

            let manifest_label = manifest_path.display().to_string();
            let manifest: RawManifest = serde_json::from_slice(&manifest_bytes)
                .map_err(|e| DoxyError::Authority(format!("{manifest_label}: {e}")))?;
            schema::validate_manifest(&manifest_label, &manifest)?;

            if data_version.is_none() {
                data_version = Some(manifest.data_version.clone());
            }

            for entry in &manifest.packages {
                let spec_path = root.join(&entry.spec_file);
                let spec_bytes = std::fs::read(&spec_path).map_err(|e| {
                    DoxyError::Authority(format!("cannot read {}: {e}", spec_path.display()))
                })?;
                hasher.update(&spec_bytes);

                let spec_label = spec_path.display().to_string();
                let spec_file: RawSpecFile = serde_json::from_slice(&spec_bytes)
                    .map_err(|e| DoxyError::Authority(format!("{spec_label}: {e}")))?;
                if spec_file.schema_version < schema::MIN_SCHEMA_VERSION {
                    return Err(DoxyError::Authority(format!(
                        "{spec_label}: unsupported schemaVersion {}",
                        spec_file.schema_version
                    )));
                }
                if spec_file.package != entry.name {
                    return Err(DoxyError::Authority(format!(
                        "{spec_label}: declares package '{}' but manifest says '{}'",
                        spec_file.package, entry.name
                    )));
                }

                packages.insert(entry.name.clone());
                for raw in spec_file.specs {
                    let spec = schema::validate_spec(&spec_label, &spec_file.package, raw)?;
                    let key = (spec.package.clone(), spec.export.clone());
                    // First-hit wins, both across sources and across the
                    // per-major files of one package.
                    specs.entry(key).or_insert_with(|| Arc::new(spec));
                }
            }
        }

        let store = Self {
            specs,
            packages,
            data_version: data_version.expect("at least one source"),
            content_hash: format!("{:x}", hasher.finalize()),
        };
        info!(
            "Loaded authority data v{}: {} packages, {} specs",
            store.data_version,
            store.packages.len(),
            store.specs.len()
        );
        Ok(store)
    }

    /// Build a store directly from validated specs. Used by embedders and
    /// tests that do not want to touch the filesystem.
    pub fn from_specs(data_version: impl Into<String>, specs: Vec<ApiSpec>) -> Self {
        let mut map: FxHashMap<(String, String), Arc<ApiSpec>> = FxHashMap::default();
        let mut packages = BTreeSet::new();
        let mut hasher = Sha256::new();
        for spec in specs {
            packages.insert(spec.package.clone());
            hasher.update(spec.key().as_bytes());
            map.entry((spec.package.clone(), spec.export.clone()))
                .or_insert_with(|| Arc::new(spec));
        }
        Self {
            specs: map,
            packages,
            data_version: data_version.into(),
            content_hash: format!("{:x}", hasher.finalize()),
        }
    }

    /// Resolve one symbol at one installed version.
    ///
    /// Returns `None` only when `(package, export)` is unknown to the
    /// dataset. An uncoercible version string yields a resolved spec that is
    /// neither available nor future, with no active signature or
    /// deprecation.
    pub fn get_api_spec(
        &self,
        package: &str,
        export: &str,
        installed_version: &str,
    ) -> Option<ResolvedApiSpec> {
        let spec = self
            .specs
            .get(&(package.to_string(), export.to_string()))?;
        Some(match coerce_version(installed_version) {
            Some(v) => resolve_at(spec, &v),
            None => {
                debug!(
                    "uncoercible version '{installed_version}' for {package}/{export}"
                );
                ResolvedApiSpec {
                    spec: Arc::clone(spec),
                    active_signature: None,
                    active_deprecation: None,
                    available: false,
                    is_future: false,
                }
            }
        })
    }

    /// Typed variant of [`get_api_spec`] for callers that already hold a
    /// coerced version.
    pub fn get_api_spec_at(
        &self,
        package: &str,
        export: &str,
        version: &Version,
    ) -> Option<ResolvedApiSpec> {
        self.specs
            .get(&(package.to_string(), export.to_string()))
            .map(|spec| resolve_at(spec, version))
    }

    /// SHA-256 over the manifest bytes followed by every referenced spec
    /// file's bytes in manifest order; any byte change anywhere changes it.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn data_version(&self) -> &str {
        &self.data_version
    }

    pub fn covered_packages(&self) -> Vec<&str> {
        self.packages.iter().map(String::as_str).collect()
    }

    pub fn has_package(&self, name: &str) -> bool {
        self.packages.contains(name)
    }

    pub fn spec_count(&self) -> usize {
        self.specs.len()
    }
}

fn resolve_at(spec: &Arc<ApiSpec>, v: &Version) -> ResolvedApiSpec {
    let available = spec.available_in.contains(v);
    let is_future = !available
        && spec
            .available_in
            .min_version()
            .map(|min| v < min)
            .unwrap_or(false);

    // Greatest since <= v wins; on an exact tie the later declaration wins,
    // so a non-strict comparison over the in-order scan is enough.
    let mut active_signature: Option<&SignatureSpec> = None;
    for sig in &spec.signatures {
        if sig.active_at(v) {
            match active_signature {
                Some(prev) if prev.since > sig.since => {}
                _ => active_signature = Some(sig),
            }
        }
    }

    let active_deprecation = spec
        .deprecations
        .iter()
        .filter(|d| d.since <= *v)
        .next_back();

    ResolvedApiSpec {
        spec: Arc::clone(spec),
        active_signature: active_signature.cloned(),
        active_deprecation: active_deprecation.cloned(),
        available,
        is_future,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionRange;
    use schema::{ApiKind, ParamSpec, ReplacementRef};

    fn create_factory_spec() -> ApiSpec {
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
                params: vec![ParamSpec {
                    name: "type".into(),
                    required: true,
                }],
            }],
            deprecations: vec![DeprecationEntry {
                since: Version::new(16, 13, 0),
                removed_in: Some(Version::new(19, 0, 0)),
                message: "createFactory is deprecated".into(),
                replacement: Some(ReplacementRef {
                    package: "react".into(),
                    export: "createElement".into(),
                    migration_hint: None,
                }),
            }],
        }
    }

    fn use_id_spec() -> ApiSpec {
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
        }
    }

    fn store() -> AuthorityStore {
        AuthorityStore::from_specs("2.1.0", vec![create_factory_spec(), use_id_spec()])
    }

    #[test]
    fn test_unknown_symbol_is_none() {
        assert!(store().get_api_spec("react", "nope", "18.2.0").is_none());
        assert!(store().get_api_spec("lodash", "map", "4.17.21").is_none());
    }

    #[test]
    fn test_query_is_pure() {
        let store = store();
        let a = store.get_api_spec("react", "createFactory", "18.2.0").unwrap();
        let b = store.get_api_spec("react", "createFactory", "18.2.0").unwrap();
        assert_eq!(a.available, b.available);
        assert_eq!(a.is_future, b.is_future);
        assert_eq!(a.active_deprecation, b.active_deprecation);
        assert_eq!(a.active_signature, b.active_signature);
    }

    #[test]
    fn test_available_with_active_deprecation() {
        let resolved = store()
            .get_api_spec("react", "createFactory", "18.2.0")
            .unwrap();
        assert!(resolved.available);
        assert!(!resolved.is_future);
        assert!(resolved.active_deprecation.is_some());
        assert!(resolved.active_signature.is_some());
    }

    #[test]
    fn test_removed_still_carries_deprecation() {
        // The removal message is surfaced through the active deprecation
        // even though the symbol is no longer available.
        let resolved = store()
            .get_api_spec("react", "createFactory", "19.0.0")
            .unwrap();
        assert!(!resolved.available);
        assert!(!resolved.is_future);
        let dep = resolved.active_deprecation.unwrap();
        assert_eq!(dep.removed_in, Some(Version::new(19, 0, 0)));
    }

    #[test]
    fn test_removed_at_removed_in_version() {
        // If a deprecation says removedIn = R, the symbol is unavailable at R.
        let resolved = store()
            .get_api_spec("react", "createFactory", "19.0.0")
            .unwrap();
        assert!(!resolved.available);
    }

    #[test]
    fn test_future_api() {
        let resolved = store().get_api_spec("react", "useId", "17.0.2").unwrap();
        assert!(!resolved.available);
        assert!(resolved.is_future);
        assert!(resolved.active_signature.is_none());

        let current = store().get_api_spec("react", "useId", "18.2.0").unwrap();
        assert!(current.available);
        assert!(!current.is_future);
    }

    #[test]
    fn test_available_and_future_mutually_exclusive() {
        let store = store();
        for v in ["0.13.0", "16.13.0", "17.0.2", "18.2.0", "19.0.0", "25.0.0"] {
            for export in ["createFactory", "useId"] {
                let r = store.get_api_spec("react", export, v).unwrap();
                assert!(
                    !(r.available && r.is_future),
                    "available and isFuture both set for {export} at {v}"
                );
            }
        }
    }

    #[test]
    fn test_uncoercible_version() {
        let resolved = store()
            .get_api_spec("react", "useId", "not-a-version")
            .unwrap();
        assert!(!resolved.available);
        assert!(!resolved.is_future);
        assert!(resolved.active_signature.is_none());
        assert!(resolved.active_deprecation.is_none());
    }

    #[test]
    fn test_signature_tie_break_later_declaration_wins() {
        let spec = ApiSpec {
            package: "pkg".into(),
            export: "f".into(),
            kind: ApiKind::Function,
            available_in: VersionRange::parse(">=1.0.0").unwrap(),
            signatures: vec![
                SignatureSpec {
                    since: Version::new(1, 0, 0),
                    until: None,
                    min_arity: 1,
                    max_arity: Some(1),
                    params: vec![],
                },
                SignatureSpec {
                    since: Version::new(1, 0, 0),
                    until: None,
                    min_arity: 2,
                    max_arity: Some(2),
                    params: vec![],
                },
            ],
            deprecations: vec![],
        };
        let store = AuthorityStore::from_specs("1.0.0", vec![spec]);
        let resolved = store.get_api_spec("pkg", "f", "1.5.0").unwrap();
        assert_eq!(resolved.active_signature.unwrap().min_arity, 2);
    }

    #[test]
    fn test_deprecation_picks_most_recent() {
        let spec = ApiSpec {
            package: "pkg".into(),
            export: "f".into(),
            kind: ApiKind::Function,
            available_in: VersionRange::parse(">=1.0.0").unwrap(),
            signatures: vec![],
            deprecations: vec![
                DeprecationEntry {
                    since: Version::new(1, 0, 0),
                    removed_in: None,
                    message: "first".into(),
                    replacement: None,
                },
                DeprecationEntry {
                    since: Version::new(2, 0, 0),
                    removed_in: None,
                    message: "second".into(),
                    replacement: None,
                },
            ],
        };
        let store = AuthorityStore::from_specs("1.0.0", vec![spec]);
        let at_1 = store.get_api_spec("pkg", "f", "1.5.0").unwrap();
        assert_eq!(at_1.active_deprecation.unwrap().message, "first");
        let at_2 = store.get_api_spec("pkg", "f", "2.5.0").unwrap();
        assert_eq!(at_2.active_deprecation.unwrap().message, "second");
    }

    #[test]
    fn test_load_from_disk_and_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("react")).unwrap();
        std::fs::write(
            dir.path().join("manifest.json"),
            r#"{
                "schemaVersion": 1,
                "dataVersion": "2.1.0",
                "packages": [
                    { "name": "react", "latestMappedVersion": "19.0.0",
                      "specFile": "react/18.x.json" }
                ]
            }"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("react/18.x.json"),
            r#"{
                "schemaVersion": 1,
                "package": "react",
                "specs": [
                    { "export": "useState", "kind": "hook",
                      "availableIn": ">=16.8.0",
                      "signatures": [
                        { "since": "16.8.0", "minArity": 0, "maxArity": 1,
                          "params": [{ "name": "initialState", "required": false }] }
                      ] }
                ]
            }"#,
        )
        .unwrap();

        let store = AuthorityStore::load(dir.path()).unwrap();
        assert_eq!(store.data_version(), "2.1.0");
        assert!(store.has_package("react"));
        assert_eq!(store.covered_packages(), vec!["react"]);
        let hash_before = store.content_hash().to_string();
        assert_eq!(hash_before.len(), 64);

        // Any byte change in any referenced file changes the hash.
        let spec_path = dir.path().join("react/18.x.json");
        let mut content = std::fs::read_to_string(&spec_path).unwrap();
        content.push(' ');
        std::fs::write(&spec_path, content).unwrap();
        let store2 = AuthorityStore::load(dir.path()).unwrap();
        assert_ne!(store2.content_hash(), hash_before);
    }

    #[test]
    fn test_load_missing_manifest_is_authority_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AuthorityStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, DoxyError::Authority(_)));
    }

    #[test]
    fn test_load_schema_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("manifest.json"),
            r#"{ "schemaVersion": 0, "dataVersion": "1.0.0", "packages": [] }"#,
        )
        .unwrap();
        assert!(AuthorityStore::load(dir.path()).is_err());
    }
}
