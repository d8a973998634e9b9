//! Repository context
//!
//! One immutable snapshot of everything about the project that version
//! resolution depends on: declared dependency ranges, lockfile-resolved
//! versions, detected frameworks, and the relevant type-compiler options.
//! The whole snapshot is hashed in a canonical form; the hash is the
//! coarse-grained cache invalidation signal.

pub mod frameworks;
pub mod lockfile;
pub mod manifest;
pub mod tsconfig;

use crate::error::DoxyError;
use crate::version::{coerce_version, exact_pin};
use anyhow::Result;
use semver::Version;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use frameworks::{Confidence, DetectedFramework};
pub use lockfile::PackageManager;
pub use tsconfig::CompilerOptions;

/// Per-package version facts.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DependencyInfo {
    /// Range from the project manifest.
    pub declared_range: Option<String>,
    /// Present iff a lockfile pinned the package.
    pub resolved_version: Option<String>,
}

impl DependencyInfo {
    /// The exact version this dependency is known to be: a lockfile
    /// resolution, or a declared range that pins a single version.
    pub fn pinned_version(&self) -> Option<Version> {
        if let Some(resolved) = &self.resolved_version {
            if let Some(v) = coerce_version(resolved) {
                return Some(v);
            }
        }
        self.declared_range.as_deref().and_then(exact_pin)
    }

    /// The version analysis runs against: the pin when one exists,
    /// otherwise the coerced lower edge of the declared range.
    pub fn analysis_version(&self) -> Option<Version> {
        self.pinned_version()
            .or_else(|| self.declared_range.as_deref().and_then(coerce_version))
    }
}

/// Everything about the project that analysis results depend on.
#[derive(Debug)]
pub struct RepoContext {
    pub root: PathBuf,
    pub package_manager: PackageManager,
    pub dependencies: BTreeMap<String, DependencyInfo>,
    pub frameworks: Vec<DetectedFramework>,
    pub compiler: CompilerOptions,
    /// Whether a lockfile contributed resolved versions this run.
    pub lockfile_present: bool,
    pub context_hash: String,
}

impl RepoContext {
    /// Build the context for a project root.
    ///
    /// `framework_overrides` come from configuration and take precedence
    /// over detection.
    pub fn build(
        root: &Path,
        framework_overrides: &BTreeMap<String, String>,
    ) -> Result<Self, DoxyError> {
        let pkg = manifest::load(root)?;
        let lock = lockfile::load(root)?;
        let compiler = tsconfig::load(root);

        let mut dependencies: BTreeMap<String, DependencyInfo> = BTreeMap::new();
        for (name, range) in pkg.declared_ranges() {
            dependencies.insert(
                name,
                DependencyInfo {
                    declared_range: Some(range),
                    resolved_version: None,
                },
            );
        }

        let (package_manager, lockfile_present) = match &lock {
            Some(lock) => {
                for (name, version) in &lock.resolved {
                    // Only declared packages participate; transitive
                    // resolutions are other packages' business.
                    if let Some(info) = dependencies.get_mut(name) {
                        info.resolved_version = Some(version.clone());
                    }
                }
                (lock.manager, true)
            }
            None => (PackageManager::Unknown, false),
        };

        let frameworks = frameworks::detect(&dependencies, framework_overrides);
        let context_hash = compute_context_hash(&dependencies, &frameworks, &compiler);

        info!(
            "repo context: {} dependencies ({} resolved), {} frameworks, manager {}",
            dependencies.len(),
            dependencies
                .values()
                .filter(|d| d.resolved_version.is_some())
                .count(),
            frameworks.len(),
            package_manager
        );

        Ok(Self {
            root: root.to_path_buf(),
            package_manager,
            dependencies,
            frameworks,
            compiler,
            lockfile_present,
            context_hash,
        })
    }

    pub fn dependency(&self, package: &str) -> Option<&DependencyInfo> {
        self.dependencies.get(package)
    }

    /// The version analysis should evaluate `package` at, if derivable.
    pub fn analysis_version(&self, package: &str) -> Option<Version> {
        self.dependencies
            .get(package)
            .and_then(DependencyInfo::analysis_version)
    }

    /// The exact current version of `package` for cache comparisons.
    pub fn pinned_version(&self, package: &str) -> Option<Version> {
        self.dependencies
            .get(package)
            .and_then(DependencyInfo::pinned_version)
    }
}

/// SHA-256 over a canonicalized rendering of the context: dependency and
/// path-alias keys lexicographically sorted (BTreeMap ordering), frameworks
/// sorted by id. Equal contexts hash equal regardless of discovery order.
fn compute_context_hash(
    dependencies: &BTreeMap<String, DependencyInfo>,
    frameworks: &[DetectedFramework],
    compiler: &CompilerOptions,
) -> String {
    #[derive(Serialize)]
    struct Canonical<'a> {
        dependencies: &'a BTreeMap<String, DependencyInfo>,
        frameworks: &'a [DetectedFramework],
        compiler: &'a CompilerOptions,
    }

    let canonical = Canonical {
        dependencies,
        frameworks,
        compiler,
    };
    let bytes = serde_json::to_vec(&canonical).expect("canonical context serializes");
    let hash = format!("{:x}", Sha256::digest(&bytes));
    debug!("context hash {hash}");
    hash
}
