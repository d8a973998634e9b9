//! Version coercion on top of the semver crate.
//!
//! Manifest and authority data carry version strings in whatever shape the
//! ecosystem produced them: `"18"`, `"18.2"`, `"^18.0.0"`, `"v19.0.0-rc.1"`.
//! This module canonicalizes those into comparable `semver::Version` /
//! `semver::VersionReq` values. Ranges are ordered-inclusive on their lower
//! bound.

use semver::{Comparator, Op, Version, VersionReq};

/// Coerce a sloppy version string to a concrete `Version`.
///
/// Strips a leading `v` and any single range operator, then pads missing
/// minor/patch components with zeros. Returns `None` for strings that still
/// fail to parse (wildcards, full ranges, garbage).
pub fn coerce_version(raw: &str) -> Option<Version> {
    let s = raw.trim();
    let s = s.strip_prefix('v').unwrap_or(s);
    let s = s
        .trim_start_matches(['^', '~', '=', '>', '<'])
        .trim_start_matches('=')
        .trim();
    if s.is_empty() || s.contains(' ') {
        return None;
    }

    if let Ok(v) = Version::parse(s) {
        return Some(v);
    }

    // Pad "18" / "18.2" out to a full triple, preserving any pre-release
    // or build suffix position (a bare major/minor never carries one).
    let numeric = s.chars().all(|c| c.is_ascii_digit() || c == '.');
    if !numeric {
        return None;
    }
    let parts: Vec<&str> = s.split('.').collect();
    let padded = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => return None,
    };
    Version::parse(&padded).ok()
}

/// Coerce a sloppy range string to a `VersionReq`.
pub fn coerce_range(raw: &str) -> Option<VersionReq> {
    let s = raw.trim();
    if s.is_empty() || s == "*" || s == "latest" {
        return Some(VersionReq::STAR);
    }
    if let Ok(req) = VersionReq::parse(s) {
        return Some(req);
    }
    // npm writes conjunctions space-separated (">=16.8.0 <19.0.0"); semver
    // wants commas.
    if s.contains(' ') && !s.contains("||") {
        let joined = s.split_whitespace().collect::<Vec<_>>().join(", ");
        if let Ok(req) = VersionReq::parse(&joined) {
            return Some(req);
        }
    }
    // "18" and friends: treat as a caret requirement on the padded version.
    coerce_version(s).and_then(|v| VersionReq::parse(&format!("^{v}")).ok())
}

/// If a declared range pins exactly one version (`"18.2.0"`, `"=18.2.0"`),
/// return it. Used by the incremental engine when no lockfile resolution
/// exists: an exact pin is as good as a lock, anything looser is ambiguous.
pub fn exact_pin(raw: &str) -> Option<Version> {
    let s = raw.trim();
    let s = s.strip_prefix('=').unwrap_or(s);
    if s.starts_with(['^', '~', '>', '<', '*']) || s.contains(' ') || s.contains("||") {
        return None;
    }
    // Bare "18" declares a major, not a pin.
    if !s.contains('.') || s.split('.').count() < 3 {
        return None;
    }
    Version::parse(s).ok()
}

/// A validated availability range with a known lower bound.
///
/// `VersionReq` answers membership; the lower bound is extracted from its
/// comparators so `is_future` checks ("introduced only later") stay O(1).
#[derive(Debug, Clone)]
pub struct VersionRange {
    raw: String,
    req: VersionReq,
    min: Option<Version>,
}

impl VersionRange {
    pub fn parse(raw: &str) -> Option<VersionRange> {
        let req = coerce_range(raw)?;
        let min = lower_bound(&req);
        Some(VersionRange {
            raw: raw.to_string(),
            req,
            min,
        })
    }

    pub fn contains(&self, v: &Version) -> bool {
        self.req.matches(v)
    }

    /// The smallest version this range can match, when derivable.
    pub fn min_version(&self) -> Option<&Version> {
        self.min.as_ref()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn lower_bound(req: &VersionReq) -> Option<Version> {
    let mut min: Option<Version> = None;
    for cmp in &req.comparators {
        let candidate = match cmp.op {
            Op::Exact | Op::GreaterEq | Op::Caret | Op::Tilde | Op::Wildcard => {
                Some(comparator_version(cmp))
            }
            Op::Greater => {
                // Exclusive lower bound; the next patch is the first member.
                let mut v = comparator_version(cmp);
                v.patch += 1;
                Some(v)
            }
            Op::Less | Op::LessEq => None,
            _ => None,
        };
        if let Some(c) = candidate {
            min = match min {
                Some(m) if m <= c => Some(m),
                _ => Some(c),
            };
        }
    }
    min
}

fn comparator_version(cmp: &Comparator) -> Version {
    Version {
        major: cmp.major,
        minor: cmp.minor.unwrap_or(0),
        patch: cmp.patch.unwrap_or(0),
        pre: cmp.pre.clone(),
        build: semver::BuildMetadata::EMPTY,
    }
}
