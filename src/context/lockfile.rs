//! Lockfile parsing for the three mainstream package managers
//!
//! Extracts the one fact doxy needs per package: the exact resolved
//! version. npm lockfiles are JSON; yarn and pnpm lockfiles are scanned
//! line-wise for the handful of shapes their entries take, which keeps the
//! parser independent of lockfile-format churn in fields we never read.
//!
//! A missing lockfile is a soft condition: callers fall back to
//! declared-range resolution.

use crate::error::DoxyError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Package manager detected from which lockfile is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    #[default]
    Unknown,
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageManager::Npm => write!(f, "npm"),
            PackageManager::Yarn => write!(f, "yarn"),
            PackageManager::Pnpm => write!(f, "pnpm"),
            PackageManager::Unknown => write!(f, "unknown"),
        }
    }
}

/// Resolved versions pinned by a lockfile.
#[derive(Debug, Default)]
pub struct Lockfile {
    pub manager: PackageManager,
    /// Top-level resolution per package name.
    pub resolved: BTreeMap<String, String>,
}

/// Load whichever lockfile the project has. `Ok(None)` when there is none;
/// an unparsable lockfile is a project error.
pub fn load(root: &Path) -> Result<Option<Lockfile>, DoxyError> {
    let npm = root.join("package-lock.json");
    if npm.exists() {
        return parse_npm(&npm).map(Some);
    }
    let yarn = root.join("yarn.lock");
    if yarn.exists() {
        return parse_yarn(&yarn).map(Some);
    }
    let pnpm = root.join("pnpm-lock.yaml");
    if pnpm.exists() {
        return parse_pnpm(&pnpm).map(Some);
    }
    debug!("no lockfile found in {}", root.display());
    Ok(None)
}

// ----------------------------------------------------------------------------
// npm (package-lock.json, v1 through v3)
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct NpmLock {
    #[serde(rename = "lockfileVersion")]
    lockfile_version: u32,
    /// v2/v3: keyed by "node_modules/<name>" paths.
    packages: BTreeMap<String, NpmLockPackage>,
    /// v1: keyed by bare names, nested deps ignored.
    dependencies: BTreeMap<String, NpmLockPackage>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct NpmLockPackage {
    version: Option<String>,
}

fn parse_npm(path: &Path) -> Result<Lockfile, DoxyError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| DoxyError::Project(format!("cannot read {}: {e}", path.display())))?;
    let lock: NpmLock = serde_json::from_str(&content)
        .map_err(|e| DoxyError::Project(format!("cannot parse {}: {e}", path.display())))?;

    let mut resolved = BTreeMap::new();
    if !lock.packages.is_empty() {
        for (key, pkg) in &lock.packages {
            // Only top-level installs; nested copies under a second
            // node_modules are another package's private resolution.
            let Some(name) = key.strip_prefix("node_modules/") else {
                continue;
            };
            if name.contains("node_modules/") {
                continue;
            }
            if let Some(version) = &pkg.version {
                resolved.insert(name.to_string(), version.clone());
            }
        }
    } else {
        for (name, pkg) in &lock.dependencies {
            if let Some(version) = &pkg.version {
                resolved.insert(name.clone(), version.clone());
            }
        }
    }

    debug!(
        "parsed {} (lockfileVersion {}): {} packages",
        path.display(),
        lock.lockfile_version,
        resolved.len()
    );
    Ok(Lockfile {
        manager: PackageManager::Npm,
        resolved,
    })
}

// ----------------------------------------------------------------------------
// yarn (yarn.lock, classic and berry)
// ----------------------------------------------------------------------------

fn parse_yarn(path: &Path) -> Result<Lockfile, DoxyError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| DoxyError::Project(format!("cannot read {}: {e}", path.display())))?;

    let mut resolved = BTreeMap::new();
    let mut current: Vec<String> = Vec::new();

    for line in content.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !line.starts_with(' ') {
            // Entry header: one or more "name@range" descriptors, possibly
            // quoted, comma separated, ending with ':'.
            current = line
                .trim_end_matches(':')
                .split(',')
                .filter_map(|d| yarn_descriptor_name(d.trim().trim_matches('"')))
                .collect();
            continue;
        }
        let trimmed = line.trim();
        // classic: `version "18.2.0"` / berry: `version: 18.2.0`
        if let Some(rest) = trimmed.strip_prefix("version") {
            let version = rest.trim_start_matches(':').trim().trim_matches('"');
            if !version.is_empty() {
                for name in &current {
                    resolved.entry(name.clone()).or_insert_with(|| version.to_string());
                }
            }
        }
    }

    debug!("parsed {}: {} packages", path.display(), resolved.len());
    Ok(Lockfile {
        manager: PackageManager::Yarn,
        resolved,
    })
}

/// `react@^18.2.0` -> `react`; `@scope/pkg@npm:^1.0.0` -> `@scope/pkg`.
fn yarn_descriptor_name(descriptor: &str) -> Option<String> {
    if descriptor.is_empty() {
        return None;
    }
    let at = if let Some(rest) = descriptor.strip_prefix('@') {
        rest.find('@').map(|i| i + 1)
    } else {
        descriptor.find('@')
    };
    match at {
        Some(idx) => Some(descriptor[..idx].to_string()),
        None => Some(descriptor.to_string()),
    }
}

// ----------------------------------------------------------------------------
// pnpm (pnpm-lock.yaml, v5 through v9 entry shapes)
// ----------------------------------------------------------------------------

fn parse_pnpm(path: &Path) -> Result<Lockfile, DoxyError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| DoxyError::Project(format!("cannot read {}: {e}", path.display())))?;

    let mut resolved = BTreeMap::new();
    let mut in_packages = false;

    for line in content.lines() {
        if !line.starts_with(' ') {
            in_packages = line.trim_end() == "packages:";
            continue;
        }
        if !in_packages {
            continue;
        }
        // Entry keys sit at one indent level and end with ':'. Shapes seen
        // across lockfile versions:
        //   /react/18.2.0:            (v5)
        //   /react@18.2.0:            (v6)
        //   react@18.2.0:             (v9)
        //   '@scope/pkg@1.2.3':       (quoted when the key needs it)
        let trimmed = line.trim();
        if !trimmed.ends_with(':') || line.starts_with("      ") {
            continue;
        }
        let key = trimmed.trim_end_matches(':').trim_matches('\'').trim_matches('"');
        let key = key.strip_prefix('/').unwrap_or(key);
        // Peer-dependency suffixes are parenthesized: react@18.2.0(foo@1.0.0)
        let key = key.split('(').next().unwrap_or(key);
        if let Some((name, version)) = pnpm_split(key) {
            resolved.entry(name).or_insert(version);
        }
    }

    if resolved.is_empty() {
        warn!("{}: no package entries recognized", path.display());
    }
    debug!("parsed {}: {} packages", path.display(), resolved.len());
    Ok(Lockfile {
        manager: PackageManager::Pnpm,
        resolved,
    })
}

fn pnpm_split(key: &str) -> Option<(String, String)> {
    // v5 used '/' between name and version, later versions use '@'. For
    // scoped packages the first '/' belongs to the name.
    let start = if key.starts_with('@') {
        key.find('/')? + 1
    } else {
        0
    };
    let sep = key[start..].find(['@', '/'])? + start;
    let (name, version) = (key[..sep].to_string(), key[sep + 1..].to_string());
    if name.is_empty() || version.is_empty() || !version.chars().next()?.is_ascii_digit() {
        return None;
    }
    Some((name, version))
}
