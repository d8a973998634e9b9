//! Framework import-normalization adapters
//!
//! An adapter declares the packages it handles and canonicalizes import
//! sources before package-name extraction, so that for example every
//! `react-dom/*` subpath resolves to the `react-dom` specs. The registry is
//! closed at startup from the detected frameworks; there is no open-world
//! dispatch.

use crate::context::DetectedFramework;
use tracing::debug;

pub trait FrameworkAdapter: Send + Sync {
    /// Matches a `DetectedFramework::id`.
    fn id(&self) -> &'static str;

    /// Packages whose imports this adapter understands.
    fn packages(&self) -> &'static [&'static str];

    /// Rewrite an import source to its canonical package form, or `None`
    /// to leave it alone.
    fn canonicalize_source(&self, source: &str) -> Option<String>;
}

/// React: subpath imports all map onto their root package.
pub struct ReactAdapter;

impl FrameworkAdapter for ReactAdapter {
    fn id(&self) -> &'static str {
        "react"
    }

    fn packages(&self) -> &'static [&'static str] {
        &["react", "react-dom"]
    }

    fn canonicalize_source(&self, source: &str) -> Option<String> {
        for root in ["react-dom", "react"] {
            if let Some(rest) = source.strip_prefix(root) {
                if rest.starts_with('/') {
                    return Some(root.to_string());
                }
            }
        }
        None
    }
}

/// Next.js: `next/<anything>` is the framework package.
pub struct NextAdapter;

impl FrameworkAdapter for NextAdapter {
    fn id(&self) -> &'static str {
        "next"
    }

    fn packages(&self) -> &'static [&'static str] {
        &["next"]
    }

    fn canonicalize_source(&self, source: &str) -> Option<String> {
        source
            .strip_prefix("next/")
            .map(|_| "next".to_string())
    }
}

/// Closed set of adapters active for one run.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn FrameworkAdapter>>,
}

impl AdapterRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Activate the adapters matching the detected frameworks.
    pub fn for_frameworks(frameworks: &[DetectedFramework]) -> Self {
        let mut adapters: Vec<Box<dyn FrameworkAdapter>> = Vec::new();
        for fw in frameworks {
            match fw.id.as_str() {
                "react" => adapters.push(Box::new(ReactAdapter)),
                "next" => adapters.push(Box::new(NextAdapter)),
                _ => {}
            }
        }
        debug!(
            "active adapters: {:?}",
            adapters.iter().map(|a| a.id()).collect::<Vec<_>>()
        );
        Self { adapters }
    }

    /// First adapter rewrite wins; unmatched sources pass through.
    pub fn canonicalize(&self, source: &str) -> String {
        for adapter in &self.adapters {
            if let Some(canonical) = adapter.canonicalize_source(source) {
                return canonical;
            }
        }
        source.to_string()
    }
}
