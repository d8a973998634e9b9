//! On-disk schema for authority data and its validation
//!
//! Layout: a `manifest.json` at the dataset root plus one spec file per
//! package/major (`<pkg>/<major>.x.json`). Both are JSON; unknown keys are
//! tolerated for forward compatibility, but structural and semantic
//! validation failures are fatal (no partial store is ever built).

use crate::error::DoxyError;
use crate::version::{coerce_version, VersionRange};
use semver::Version;
use serde::{Deserialize, Serialize};

/// Lowest manifest/spec schema version this build understands.
pub const MIN_SCHEMA_VERSION: u32 = 1;

// ----------------------------------------------------------------------------
// Raw serde records (wire format)
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawManifest {
    pub schema_version: u32,
    pub data_version: String,
    pub packages: Vec<RawManifestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawManifestEntry {
    pub name: String,
    #[serde(default)]
    pub latest_mapped_version: Option<String>,
    pub spec_file: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSpecFile {
    pub schema_version: u32,
    pub package: String,
    pub specs: Vec<RawApiSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawApiSpec {
    /// Defaults to the containing file's package when omitted.
    #[serde(default)]
    pub package: Option<String>,
    pub export: String,
    pub kind: ApiKind,
    pub available_in: String,
    #[serde(default)]
    pub signatures: Vec<RawSignature>,
    #[serde(default)]
    pub deprecations: Vec<RawDeprecation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSignature {
    pub since: String,
    #[serde(default)]
    pub until: Option<String>,
    pub min_arity: u32,
    #[serde(default)]
    pub max_arity: Option<u32>,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeprecation {
    pub since: String,
    #[serde(default)]
    pub removed_in: Option<String>,
    pub message: String,
    #[serde(default)]
    pub replacement: Option<ReplacementRef>,
}

// ----------------------------------------------------------------------------
// Validated in-memory model
// ----------------------------------------------------------------------------

/// What species of export a spec describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKind {
    Function,
    Component,
    Type,
    Constant,
    Class,
    Hook,
}

/// One positional parameter of a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

/// A signature valid over `[since, until)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSpec {
    pub since: Version,
    pub until: Option<Version>,
    pub min_arity: u32,
    /// None means unbounded.
    pub max_arity: Option<u32>,
    pub params: Vec<ParamSpec>,
}

impl SignatureSpec {
    pub fn active_at(&self, v: &Version) -> bool {
        if *v < self.since {
            return false;
        }
        match &self.until {
            Some(until) => v < until,
            None => true,
        }
    }

    pub fn arity_label(&self) -> String {
        match self.max_arity {
            Some(max) if max == self.min_arity => format!("{max}"),
            Some(max) => format!("{}\u{2013}{}", self.min_arity, max),
            None => format!("{}+", self.min_arity),
        }
    }
}

/// Where a deprecated symbol's callers should go instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementRef {
    pub package: String,
    pub export: String,
    #[serde(default)]
    pub migration_hint: Option<String>,
}

/// One entry in a symbol's deprecation timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationEntry {
    pub since: Version,
    pub removed_in: Option<Version>,
    pub message: String,
    pub replacement: Option<ReplacementRef>,
}

/// The canonical description of one exported symbol.
#[derive(Debug, Clone)]
pub struct ApiSpec {
    pub package: String,
    pub export: String,
    pub kind: ApiKind,
    pub available_in: VersionRange,
    pub signatures: Vec<SignatureSpec>,
    pub deprecations: Vec<DeprecationEntry>,
}

impl ApiSpec {
    pub fn key(&self) -> String {
        format!("{}/{}", self.package, self.export)
    }
}

// ----------------------------------------------------------------------------
// Raw -> validated conversion
// ----------------------------------------------------------------------------

fn bad(file: &str, what: impl std::fmt::Display) -> DoxyError {
    DoxyError::Authority(format!("{file}: {what}"))
}

fn parse_version(file: &str, field: &str, raw: &str) -> Result<Version, DoxyError> {
    coerce_version(raw).ok_or_else(|| bad(file, format!("{field}: invalid version '{raw}'")))
}

pub fn validate_manifest(file: &str, raw: &RawManifest) -> Result<(), DoxyError> {
    if raw.schema_version < MIN_SCHEMA_VERSION {
        return Err(bad(
            file,
            format!("unsupported schemaVersion {}", raw.schema_version),
        ));
    }
    if coerce_version(&raw.data_version).is_none() {
        return Err(bad(
            file,
            format!("invalid dataVersion '{}'", raw.data_version),
        ));
    }
    for entry in &raw.packages {
        if entry.name.is_empty() || entry.spec_file.is_empty() {
            return Err(bad(file, "manifest entry with empty name or specFile"));
        }
    }
    Ok(())
}

/// Validate one raw spec and lower it into the in-memory model.
pub fn validate_spec(file: &str, default_package: &str, raw: RawApiSpec) -> Result<ApiSpec, DoxyError> {
    let package = raw.package.unwrap_or_else(|| default_package.to_string());
    let label = format!("{package}/{}", raw.export);

    if raw.export.is_empty() {
        return Err(bad(file, "spec with empty export name"));
    }

    let available_in = VersionRange::parse(&raw.available_in)
        .ok_or_else(|| bad(file, format!("{label}: invalid availableIn '{}'", raw.available_in)))?;

    let mut signatures = Vec::with_capacity(raw.signatures.len());
    for sig in raw.signatures {
        let since = parse_version(file, &format!("{label}: signature since"), &sig.since)?;
        let until = sig
            .until
            .as_deref()
            .map(|u| parse_version(file, &format!("{label}: signature until"), u))
            .transpose()?;
        if let Some(max) = sig.max_arity {
            if max < sig.min_arity {
                return Err(bad(
                    file,
                    format!("{label}: maxArity {} < minArity {}", max, sig.min_arity),
                ));
            }
        }
        if let Some(ref until) = until {
            if *until <= since {
                return Err(bad(file, format!("{label}: signature until <= since")));
            }
        }
        signatures.push(SignatureSpec {
            since,
            until,
            min_arity: sig.min_arity,
            max_arity: sig.max_arity,
            params: sig.params,
        });
    }

    let mut deprecations = Vec::with_capacity(raw.deprecations.len());
    let mut prev_since: Option<Version> = None;
    for dep in raw.deprecations {
        let since = parse_version(file, &format!("{label}: deprecation since"), &dep.since)?;
        if let Some(prev) = &prev_since {
            if since < *prev {
                return Err(bad(
                    file,
                    format!("{label}: deprecations not ordered by since"),
                ));
            }
        }
        prev_since = Some(since.clone());

        let removed_in = dep
            .removed_in
            .as_deref()
            .map(|r| parse_version(file, &format!("{label}: removedIn"), r))
            .transpose()?;
        if let Some(ref removed) = removed_in {
            // A removal at V means availableIn must exclude >= V.
            if available_in.contains(removed) {
                return Err(bad(
                    file,
                    format!("{label}: removedIn {removed} lies inside availableIn"),
                ));
            }
        }
        deprecations.push(DeprecationEntry {
            since,
            removed_in,
            message: dep.message,
            replacement: dep.replacement,
        });
    }

    Ok(ApiSpec {
        package,
        export: raw.export,
        kind: raw.kind,
        available_in,
        signatures,
        deprecations,
    })
}
