//! Source parsers behind the normalized AST
//!
//! The parser role is interface-shaped: a parser declares the extensions it
//! handles and turns file content into a [`NormalizedAst`]. The registry is
//! closed at startup; the built-in lightweight scanner covers the
//! JavaScript/TypeScript family, and a heavier parser can be swapped in
//! without touching anything downstream.

pub mod lightweight;

use crate::ast::NormalizedAst;
use anyhow::Result;
use std::path::Path;

pub use lightweight::LightweightParser;

/// A language parser that can produce the normalized snapshot.
pub trait SourceParser: Send + Sync {
    /// Stable identifier, for logs and internal-error findings.
    fn id(&self) -> &'static str;

    /// File extensions (without dot) this parser claims.
    fn extensions(&self) -> &'static [&'static str];

    fn parse(&self, path: &Path, source: &str) -> Result<NormalizedAst>;
}

/// Closed set of parsers, consulted per file extension.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn SourceParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Registry with the built-in parsers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(LightweightParser::new()));
        registry
    }

    pub fn register(&mut self, parser: Box<dyn SourceParser>) {
        self.parsers.push(parser);
    }

    /// The first parser claiming the path's extension.
    pub fn for_path(&self, path: &Path) -> Option<&dyn SourceParser> {
        let ext = path.extension()?.to_str()?;
        self.parsers
            .iter()
            .find(|p| p.extensions().contains(&ext))
            .map(|p| p.as_ref())
    }

    /// Every extension any parser claims; drives candidate file discovery.
    pub fn extensions(&self) -> Vec<&'static str> {
        let mut exts: Vec<&'static str> = self
            .parsers
            .iter()
            .flat_map(|p| p.extensions().iter().copied())
            .collect();
        exts.sort_unstable();
        exts.dedup();
        exts
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
