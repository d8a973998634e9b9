//! Language-agnostic source snapshot
//!
//! The normalized AST is the contract between the per-language parsers and
//! everything downstream: imports, call expressions, JSX-style element
//! uses, and the comment spans the suppression scanner reads. Any parser
//! that produces this shape can slot into the pipeline.

use serde::{Deserialize, Serialize};

/// 1-indexed position inside one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// One named specifier inside an import statement.
///
/// `import { useState as useMyState } from 'react'` binds
/// `local = useMyState` to `imported = useState`; downstream only ever sees
/// the canonical imported name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedSpecifier {
    pub imported: String,
    pub local: String,
    pub is_type_only: bool,
}

/// A static import statement, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NormalizedImport {
    /// The module specifier string as written.
    pub source: String,
    pub named: Vec<NamedSpecifier>,
    pub default_local: Option<String>,
    pub namespace_local: Option<String>,
    /// `import type ... from ...` - carries no runtime binding.
    pub is_type_only: bool,
    /// `import('spec')` with a literal specifier; computed specifiers are
    /// not represented at all.
    pub is_dynamic: bool,
    pub location: SourceLocation,
}

/// A call expression with a dotted callee path such as `useState` or
/// `React.createElement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCallExpression {
    pub callee: String,
    /// None when a spread argument makes the count indeterminate.
    pub arg_count: Option<u32>,
    /// Names of simple identifier arguments, empty when unknown.
    pub arg_names: Vec<String>,
    pub location: SourceLocation,
}

/// A JSX-like element use: `<Select multiple />`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedJsxElement {
    pub tag_name: String,
    pub attributes: Vec<String>,
    pub location: SourceLocation,
}

/// A comment's text and the closed line range it occupies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSpan {
    pub text: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// Everything doxy needs to know about one source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedAst {
    pub imports: Vec<NormalizedImport>,
    pub calls: Vec<NormalizedCallExpression>,
    pub jsx_elements: Vec<NormalizedJsxElement>,
    pub comments: Vec<CommentSpan>,
}

impl NormalizedAst {
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.calls.is_empty() && self.jsx_elements.is_empty()
    }
}
