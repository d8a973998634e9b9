//! Lightweight JavaScript/TypeScript scanner
//!
//! A regex-and-state-machine extractor that produces the normalized AST
//! without building a syntax tree: static imports, literal dynamic imports,
//! call expressions with argument counts, JSX element uses, and comment
//! spans. It deliberately trades exhaustive grammar coverage for speed and
//! zero native dependencies; anything it cannot see (computed specifiers,
//! re-export chains) is out of scope for the resolver anyway.

use crate::ast::{
    CommentSpan, NamedSpecifier, NormalizedAst, NormalizedCallExpression, NormalizedImport,
    NormalizedJsxElement, SourceLocation,
};
use crate::parse::SourceParser;
use anyhow::Result;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

static IMPORT: OnceLock<Regex> = OnceLock::new();
static SIDE_EFFECT_IMPORT: OnceLock<Regex> = OnceLock::new();
static DYNAMIC_IMPORT: OnceLock<Regex> = OnceLock::new();
static CALL: OnceLock<Regex> = OnceLock::new();
static JSX_OPEN: OnceLock<Regex> = OnceLock::new();

fn import_re() -> &'static Regex {
    // One pattern per clause shape; `from '...'` anchors the statement.
    IMPORT.get_or_init(|| {
        Regex::new(
            r#"(?m)^\s*import\s+(?:(?P<type>type)\s+)?(?:(?P<def_ns>[A-Za-z_$][\w$]*)\s*,\s*\*\s*as\s+(?P<ns_after_def>[A-Za-z_$][\w$]*)|(?P<def_named>[A-Za-z_$][\w$]*)\s*,\s*\{(?P<named_after_def>[^}]*)\}|\*\s*as\s+(?P<ns>[A-Za-z_$][\w$]*)|\{(?P<named>[^}]*)\}|(?P<def>[A-Za-z_$][\w$]*))\s*from\s*['"](?P<src>[^'"]+)['"]"#,
        )
        .unwrap()
    })
}

fn side_effect_import_re() -> &'static Regex {
    SIDE_EFFECT_IMPORT
        .get_or_init(|| Regex::new(r#"(?m)^\s*import\s*['"](?P<src>[^'"]+)['"]"#).unwrap())
}

fn dynamic_import_re() -> &'static Regex {
    DYNAMIC_IMPORT
        .get_or_init(|| Regex::new(r#"\bimport\s*\(\s*['"](?P<src>[^'"]+)['"]\s*\)"#).unwrap())
}

fn call_re() -> &'static Regex {
    CALL.get_or_init(|| {
        Regex::new(r"(?P<callee>[A-Za-z_$][\w$]*(?:\s*\.\s*[A-Za-z_$][\w$]*)*)\s*\(").unwrap()
    })
}

fn jsx_open_re() -> &'static Regex {
    // Capital-initial tags only: lowercase tags are host elements, not
    // imported components.
    JSX_OPEN.get_or_init(|| {
        Regex::new(r"<(?P<tag>[A-Z][\w$]*(?:\.[A-Za-z_$][\w$]*)*)(?P<rest>[\s/>])").unwrap()
    })
}

/// Statement keywords that look like callees to the call regex.
const NON_CALL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "typeof", "await", "yield",
    "do", "else", "new", "delete", "void", "in", "of", "instanceof", "import", "export", "throw",
    "case",
];

pub struct LightweightParser;

impl LightweightParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LightweightParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for LightweightParser {
    fn id(&self) -> &'static str {
        "lightweight-js"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "ts", "tsx", "mjs", "cjs"]
    }

    fn parse(&self, path: &Path, source: &str) -> Result<NormalizedAst> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let jsx_capable = matches!(ext, "jsx" | "tsx" | "js" | "mjs");

        let scanned = Scanned::new(source);
        let lines = LineIndex::new(&scanned.clean);

        let mut ast = NormalizedAst {
            comments: scanned.comments.clone(),
            ..Default::default()
        };

        extract_imports(&scanned, &lines, &mut ast);
        extract_calls(&scanned, &lines, &mut ast);
        if jsx_capable {
            extract_jsx(&scanned, &lines, &mut ast);
        }

        Ok(ast)
    }
}

// ----------------------------------------------------------------------------
// Pre-scan: comments out, string spans recorded
// ----------------------------------------------------------------------------

/// The pre-scanned file: comments replaced with spaces (newlines kept, so
/// every byte offset maps to the same line/column as the original), comment
/// spans collected, and the byte ranges of string/template literal contents
/// recorded so the extractors can refuse matches inside them. Import
/// specifiers stay readable because literal bytes are not rewritten.
struct Scanned {
    clean: String,
    comments: Vec<CommentSpan>,
    /// Half-open content ranges of string and template literals.
    string_spans: Vec<(usize, usize)>,
}

impl Scanned {
    fn new(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut comments = Vec::new();
        let mut string_spans = Vec::new();
        let mut line: u32 = 1;
        let mut i = 0;

        #[derive(PartialEq)]
        enum State {
            Code,
            Str(u8),
            Template,
        }
        let mut state = State::Code;
        let mut literal_start = 0usize;

        while i < bytes.len() {
            let b = bytes[i];
            match state {
                State::Code => match b {
                    b'\'' | b'"' => {
                        state = State::Str(b);
                        literal_start = i + 1;
                        out.push(b);
                        i += 1;
                    }
                    b'`' => {
                        state = State::Template;
                        literal_start = i + 1;
                        out.push(b);
                        i += 1;
                    }
                    b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                        let start = i;
                        while i < bytes.len() && bytes[i] != b'\n' {
                            out.push(b' ');
                            i += 1;
                        }
                        comments.push(CommentSpan {
                            text: source[start..i].to_string(),
                            start_line: line,
                            end_line: line,
                        });
                    }
                    b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                        let start = i;
                        let start_line = line;
                        i += 2;
                        out.push(b' ');
                        out.push(b' ');
                        while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                            if bytes[i] == b'\n' {
                                line += 1;
                                out.push(b'\n');
                            } else {
                                out.push(b' ');
                            }
                            i += 1;
                        }
                        let end = (i + 2).min(bytes.len());
                        for _ in i..end {
                            out.push(b' ');
                        }
                        comments.push(CommentSpan {
                            text: source[start..end].to_string(),
                            start_line,
                            end_line: line,
                        });
                        i = end;
                    }
                    b'\n' => {
                        line += 1;
                        out.push(b);
                        i += 1;
                    }
                    _ => {
                        out.push(b);
                        i += 1;
                    }
                },
                State::Str(quote) => {
                    out.push(b);
                    if b == b'\\' && i + 1 < bytes.len() {
                        if bytes[i + 1] == b'\n' {
                            line += 1;
                        }
                        out.push(bytes[i + 1]);
                        i += 2;
                        continue;
                    }
                    if b == quote || b == b'\n' {
                        if b == b'\n' {
                            line += 1;
                        }
                        string_spans.push((literal_start, i));
                        state = State::Code;
                    }
                    i += 1;
                }
                State::Template => {
                    out.push(b);
                    if b == b'\\' && i + 1 < bytes.len() {
                        if bytes[i + 1] == b'\n' {
                            line += 1;
                        }
                        out.push(bytes[i + 1]);
                        i += 2;
                        continue;
                    }
                    if b == b'\n' {
                        line += 1;
                    } else if b == b'`' {
                        string_spans.push((literal_start, i));
                        state = State::Code;
                    }
                    i += 1;
                }
            }
        }
        // Unterminated literal runs to EOF.
        if !matches!(state, State::Code) {
            string_spans.push((literal_start, bytes.len()));
        }

        Self {
            clean: String::from_utf8_lossy(&out).into_owned(),
            comments,
            string_spans,
        }
    }

    /// Whether a byte offset lies inside a string or template literal.
    fn in_string(&self, offset: usize) -> bool {
        let idx = self.string_spans.partition_point(|(start, _)| *start <= offset);
        idx > 0 && offset < self.string_spans[idx - 1].1
    }
}

// ----------------------------------------------------------------------------
// Offset -> line/column mapping
// ----------------------------------------------------------------------------

struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    fn location(&self, offset: usize) -> SourceLocation {
        let line = match self.starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        SourceLocation::new(line as u32 + 1, (offset - self.starts[line]) as u32 + 1)
    }
}

// ----------------------------------------------------------------------------
// Imports
// ----------------------------------------------------------------------------

fn extract_imports(scanned: &Scanned, lines: &LineIndex, ast: &mut NormalizedAst) {
    let clean = scanned.clean.as_str();
    for caps in import_re().captures_iter(clean) {
        let whole = caps.get(0).unwrap();
        if scanned.in_string(whole.start() + leading_ws(whole.as_str())) {
            continue;
        }
        let location = lines.location(whole.start() + leading_ws(whole.as_str()));
        let source = caps["src"].to_string();
        let is_type_only = caps.name("type").is_some();

        let mut import = NormalizedImport {
            source,
            is_type_only,
            location,
            ..Default::default()
        };

        if let Some(def) = caps
            .name("def")
            .or_else(|| caps.name("def_ns"))
            .or_else(|| caps.name("def_named"))
        {
            import.default_local = Some(def.as_str().to_string());
        }
        if let Some(ns) = caps.name("ns").or_else(|| caps.name("ns_after_def")) {
            import.namespace_local = Some(ns.as_str().to_string());
        }
        if let Some(named) = caps.name("named").or_else(|| caps.name("named_after_def")) {
            import.named = parse_named_specifiers(named.as_str(), is_type_only);
        }

        ast.imports.push(import);
    }

    for caps in side_effect_import_re().captures_iter(clean) {
        let whole = caps.get(0).unwrap();
        if scanned.in_string(whole.start() + leading_ws(whole.as_str())) {
            continue;
        }
        ast.imports.push(NormalizedImport {
            source: caps["src"].to_string(),
            location: lines.location(whole.start() + leading_ws(whole.as_str())),
            ..Default::default()
        });
    }

    for caps in dynamic_import_re().captures_iter(clean) {
        let whole = caps.get(0).unwrap();
        if scanned.in_string(whole.start()) {
            continue;
        }
        ast.imports.push(NormalizedImport {
            source: caps["src"].to_string(),
            is_dynamic: true,
            location: lines.location(whole.start()),
            ..Default::default()
        });
    }

    // Source order regardless of which pattern found them.
    ast.imports.sort_by_key(|imp| (imp.location.line, imp.location.column));
}

fn leading_ws(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

/// `useState, useEffect as effect, type Props` -> named specifiers.
fn parse_named_specifiers(list: &str, statement_type_only: bool) -> Vec<NamedSpecifier> {
    let mut named = Vec::new();
    for item in list.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let (item, specifier_type_only) = match item.strip_prefix("type ") {
            Some(rest) => (rest.trim(), true),
            None => (item, statement_type_only),
        };
        let (imported, local) = match item.split_once(" as ") {
            Some((imported, local)) => (imported.trim(), local.trim()),
            None => (item, item),
        };
        if imported.is_empty() || local.is_empty() {
            continue;
        }
        named.push(NamedSpecifier {
            imported: imported.to_string(),
            local: local.to_string(),
            is_type_only: specifier_type_only,
        });
    }
    named
}

// ----------------------------------------------------------------------------
// Call expressions
// ----------------------------------------------------------------------------

fn extract_calls(scanned: &Scanned, lines: &LineIndex, ast: &mut NormalizedAst) {
    let clean = scanned.clean.as_str();
    for caps in call_re().captures_iter(clean) {
        let callee_match = caps.name("callee").unwrap();
        if scanned.in_string(callee_match.start()) {
            continue;
        }
        let callee: String = callee_match
            .as_str()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        let head = callee.split('.').next().unwrap_or("");
        if NON_CALL_KEYWORDS.contains(&head) {
            continue;
        }
        // Declarations and constructions are not call sites of the binding.
        if preceded_by_keyword(clean, callee_match.start(), &["function", "new", "class"]) {
            continue;
        }
        // `obj.method(...)` where obj is unknown is handled by the resolver;
        // but a callee fragment preceded by `.` means the regex started
        // mid-chain (e.g. `foo().bar(`) and the head is not a binding.
        if preceded_by_char(clean, callee_match.start(), '.') {
            continue;
        }

        let open_paren = caps.get(0).unwrap().end() - 1;
        let (arg_count, arg_names) = scan_arguments(clean, open_paren);

        ast.calls.push(NormalizedCallExpression {
            callee,
            arg_count,
            arg_names,
            location: lines.location(callee_match.start()),
        });
    }
}

fn preceded_by_char(text: &str, offset: usize, ch: char) -> bool {
    text[..offset]
        .trim_end()
        .chars()
        .next_back()
        .map(|c| c == ch)
        .unwrap_or(false)
}

fn preceded_by_keyword(text: &str, offset: usize, keywords: &[&str]) -> bool {
    let before = text[..offset].trim_end();
    keywords.iter().any(|kw| {
        before.ends_with(kw)
            && before[..before.len() - kw.len()]
                .chars()
                .next_back()
                .map(|c| !c.is_alphanumeric() && c != '_' && c != '$')
                .unwrap_or(true)
    })
}

/// Walk the argument list starting at the opening paren. Returns the
/// top-level argument count (None when a spread or unbalanced input makes
/// it indeterminate) and the simple identifier arguments by name.
fn scan_arguments(text: &str, open_paren: usize) -> (Option<u32>, Vec<String>) {
    let bytes = text.as_bytes();
    debug_assert_eq!(bytes[open_paren], b'(');

    let mut depth = 0usize;
    let mut i = open_paren;
    let mut current = String::new();
    let mut args: Vec<String> = Vec::new();
    let mut saw_spread = false;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => {
                quote = Some(b);
                current.push('\u{1}'); // opaque marker, not an identifier
                i += 1;
            }
            b'(' | b'[' | b'{' => {
                if depth > 0 {
                    current.push(b as char);
                }
                depth += 1;
                i += 1;
            }
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if b == b')' {
                        // End of the argument list.
                        let trimmed = current.trim().to_string();
                        if !trimmed.is_empty() {
                            args.push(trimmed);
                        }
                        let count = if saw_spread {
                            None
                        } else {
                            Some(args.len() as u32)
                        };
                        // Named arguments are the keys of object-literal
                        // arguments (`useQuery({ queryKey, retry: 3 })`);
                        // positional identifiers carry no name contract.
                        let names = args.iter().flat_map(|a| object_keys(a)).collect();
                        return (count, names);
                    }
                    // Unbalanced close of another bracket kind.
                    return (None, Vec::new());
                }
                current.push(b as char);
                i += 1;
            }
            b',' if depth == 1 => {
                let trimmed = current.trim().to_string();
                if !trimmed.is_empty() {
                    args.push(trimmed);
                }
                current.clear();
                i += 1;
            }
            _ => {
                if depth == 1 && b == b'.' && bytes[i..].starts_with(b"...") {
                    saw_spread = true;
                    i += 3;
                    continue;
                }
                if depth >= 1 {
                    current.push(b as char);
                }
                i += 1;
            }
        }
    }

    // Ran off the end of the file.
    (None, Vec::new())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Top-level keys of an object-literal argument, both `key: value` and
/// shorthand forms. Non-object arguments yield nothing.
fn object_keys(arg: &str) -> Vec<String> {
    let arg = arg.trim();
    let Some(body) = arg.strip_prefix('{').and_then(|a| a.strip_suffix('}')) else {
        return Vec::new();
    };

    let mut keys = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in body.chars().chain(std::iter::once(',')) {
        match c {
            '{' | '[' | '(' => {
                depth += 1;
                current.push(c);
            }
            '}' | ']' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                let entry = current.trim();
                let key = entry.split(':').next().unwrap_or("").trim();
                if is_identifier(key) {
                    keys.push(key.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    keys
}

// ----------------------------------------------------------------------------
// JSX elements
// ----------------------------------------------------------------------------

/// Keywords that may legitimately precede a JSX expression.
const JSX_PRECEDING_KEYWORDS: &[&str] = &["return", "default", "case", "yield", "await", "do", "else"];

fn extract_jsx(scanned: &Scanned, lines: &LineIndex, ast: &mut NormalizedAst) {
    let clean = scanned.clean.as_str();
    for caps in jsx_open_re().captures_iter(clean) {
        let tag_match = caps.name("tag").unwrap();
        let whole = caps.get(0).unwrap();
        if scanned.in_string(whole.start()) {
            continue;
        }

        // `a < B` comparison guard: a JSX opener is preceded by something
        // that cannot end an expression, or by a statement keyword.
        let before = clean[..whole.start()].trim_end();
        if let Some(prev) = before.chars().next_back() {
            if prev.is_alphanumeric() || prev == '_' || prev == ')' || prev == ']' {
                let tail_word: String = before
                    .chars()
                    .rev()
                    .take_while(|c| c.is_alphanumeric() || *c == '_')
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                if !JSX_PRECEDING_KEYWORDS.contains(&tail_word.as_str()) {
                    continue;
                }
            }
        }

        let attrs_start = whole.end() - 1; // the char matched by `rest`
        let attributes = scan_jsx_attributes(clean, attrs_start);

        ast.jsx_elements.push(NormalizedJsxElement {
            tag_name: tag_match.as_str().to_string(),
            attributes,
            location: lines.location(whole.start()),
        });
    }
}

/// Collect attribute names until the element's `>` (or `/>`), skipping
/// quoted and braced values.
fn scan_jsx_attributes(text: &str, from: usize) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut attributes = Vec::new();
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'>' => break,
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'>' => break,
            b'{' => {
                // Spread props or expression container; skip balanced.
                let mut depth = 0usize;
                while i < bytes.len() {
                    match bytes[i] {
                        b'{' => depth += 1,
                        b'}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            c if (c as char).is_alphabetic() || c == b'_' => {
                let start = i;
                while i < bytes.len() {
                    let c = bytes[i] as char;
                    if c.is_alphanumeric() || c == '_' || c == '-' || c == ':' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                attributes.push(text[start..i].to_string());
                // Skip an attached value.
                let mut j = i;
                while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                    j += 1;
                }
                if j < bytes.len() && bytes[j] == b'=' {
                    j += 1;
                    while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                        j += 1;
                    }
                    match bytes.get(j) {
                        Some(b'"') | Some(b'\'') => {
                            let q = bytes[j];
                            j += 1;
                            while j < bytes.len() && bytes[j] != q {
                                j += 1;
                            }
                            j += 1;
                        }
                        Some(b'{') => {
                            let mut depth = 0usize;
                            while j < bytes.len() {
                                match bytes[j] {
                                    b'{' => depth += 1,
                                    b'}' => {
                                        depth -= 1;
                                        if depth == 0 {
                                            break;
                                        }
                                    }
                                    _ => {}
                                }
                                j += 1;
                            }
                            j += 1;
                        }
                        _ => {
                            while j < bytes.len()
                                && !(bytes[j] as char).is_whitespace()
                                && bytes[j] != b'>'
                                && bytes[j] != b'/'
                            {
                                j += 1;
                            }
                        }
                    }
                    i = j;
                }
            }
            _ => i += 1,
        }
    }

    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(name: &str, source: &str) -> NormalizedAst {
        LightweightParser::new()
            .parse(&PathBuf::from(name), source)
            .unwrap()
    }

    #[test]
    fn test_named_import() {
        let ast = parse(
            "a.ts",
            "import { useState, useEffect as effect } from 'react';\n",
        );
        assert_eq!(ast.imports.len(), 1);
        let imp = &ast.imports[0];
        assert_eq!(imp.source, "react");
        assert_eq!(imp.named.len(), 2);
        assert_eq!(imp.named[0].imported, "useState");
        assert_eq!(imp.named[0].local, "useState");
        assert_eq!(imp.named[1].imported, "useEffect");
        assert_eq!(imp.named[1].local, "effect");
        assert_eq!(imp.location.line, 1);
    }

    #[test]
    fn test_default_and_namespace_imports() {
        let ast = parse(
            "a.ts",
            "import React from 'react';\nimport * as ReactDOM from 'react-dom';\nimport Def, { named } from 'pkg';\n",
        );
        assert_eq!(ast.imports[0].default_local.as_deref(), Some("React"));
        assert_eq!(ast.imports[1].namespace_local.as_deref(), Some("ReactDOM"));
        assert_eq!(ast.imports[2].default_local.as_deref(), Some("Def"));
        assert_eq!(ast.imports[2].named[0].imported, "named");
    }

    #[test]
    fn test_multiline_named_import() {
        let ast = parse(
            "a.ts",
            "import {\n  useState,\n  useMemo,\n} from 'react';\n",
        );
        assert_eq!(ast.imports[0].named.len(), 2);
        assert_eq!(ast.imports[0].location.line, 1);
    }

    #[test]
    fn test_type_only_imports() {
        let ast = parse(
            "a.ts",
            "import type { Props } from 'react';\nimport { useState, type FC } from 'react';\n",
        );
        assert!(ast.imports[0].is_type_only);
        assert!(ast.imports[0].named[0].is_type_only);
        assert!(!ast.imports[1].is_type_only);
        assert!(!ast.imports[1].named[0].is_type_only);
        assert!(ast.imports[1].named[1].is_type_only);
    }

    #[test]
    fn test_side_effect_and_dynamic_imports() {
        let ast = parse(
            "a.ts",
            "import './styles.css';\nconst mod = await import('lodash');\n",
        );
        assert_eq!(ast.imports[0].source, "./styles.css");
        assert!(!ast.imports[0].is_dynamic);
        assert_eq!(ast.imports[1].source, "lodash");
        assert!(ast.imports[1].is_dynamic);
    }

    #[test]
    fn test_call_extraction_with_arity() {
        let ast = parse(
            "a.ts",
            "const [n, setN] = useState(0);\nuseEffect(() => { tick(n, 1); }, [n]);\n",
        );
        let use_state = ast.calls.iter().find(|c| c.callee == "useState").unwrap();
        assert_eq!(use_state.arg_count, Some(1));
        assert_eq!(use_state.location.line, 1);

        let use_effect = ast.calls.iter().find(|c| c.callee == "useEffect").unwrap();
        assert_eq!(use_effect.arg_count, Some(2));

        let tick = ast.calls.iter().find(|c| c.callee == "tick").unwrap();
        assert_eq!(tick.arg_count, Some(2));
        assert!(tick.arg_names.is_empty());
    }

    #[test]
    fn test_object_argument_keys_become_arg_names() {
        let ast = parse(
            "a.ts",
            "useQuery({ queryKey, queryFn: fetcher, retry: 3, onError: (e) => log(e) }, opts);\n",
        );
        let call = ast.calls.iter().find(|c| c.callee == "useQuery").unwrap();
        assert_eq!(call.arg_count, Some(2));
        assert_eq!(call.arg_names, vec!["queryKey", "queryFn", "retry", "onError"]);
    }

    #[test]
    fn test_call_zero_args_and_nested_parens() {
        let ast = parse("a.ts", "useId();\nfmt((a + b) * 2, g(x, y));\n");
        assert_eq!(
            ast.calls.iter().find(|c| c.callee == "useId").unwrap().arg_count,
            Some(0)
        );
        assert_eq!(
            ast.calls.iter().find(|c| c.callee == "fmt").unwrap().arg_count,
            Some(2)
        );
    }

    #[test]
    fn test_call_spread_is_indeterminate() {
        let ast = parse("a.ts", "merge(...parts);\n");
        assert_eq!(ast.calls[0].arg_count, None);
    }

    #[test]
    fn test_dotted_callee() {
        let ast = parse("a.ts", "React.createElement('div', props);\n");
        let call = &ast.calls[0];
        assert_eq!(call.callee, "React.createElement");
        assert_eq!(call.arg_count, Some(2));
        assert!(call.arg_names.is_empty());
    }

    #[test]
    fn test_keywords_and_declarations_not_calls() {
        let ast = parse(
            "a.ts",
            "if (x) { f(); }\nfor (let i = 0; i < n; i++) {}\nfunction helper(a) {}\nnew Thing(1);\nfoo().bar();\n",
        );
        let callees: Vec<&str> = ast.calls.iter().map(|c| c.callee.as_str()).collect();
        assert!(callees.contains(&"f"));
        assert!(!callees.contains(&"if"));
        assert!(!callees.contains(&"for"));
        assert!(!callees.contains(&"helper"));
        assert!(!callees.contains(&"Thing"));
        assert!(callees.contains(&"foo"));
        // `.bar(` after `foo()` starts mid-chain; its head is not a binding.
        assert!(!callees.contains(&"bar"));
    }

    #[test]
    fn test_calls_inside_comments_and_strings() {
        let ast = parse(
            "a.ts",
            "// useState(1)\n/* useEffect(() => {}) */\nconst s = 'not useMemo(1)';\nreal(2);\n",
        );
        let callees: Vec<&str> = ast.calls.iter().map(|c| c.callee.as_str()).collect();
        assert!(!callees.contains(&"useState"));
        assert!(!callees.contains(&"useEffect"));
        assert!(!callees.contains(&"useMemo"));
        assert!(callees.contains(&"real"));
        assert_eq!(ast.comments.len(), 2);
    }

    #[test]
    fn test_comment_spans() {
        let ast = parse("a.ts", "// one\ncode();\n/* two\n   lines */\n");
        assert_eq!(ast.comments[0].start_line, 1);
        assert_eq!(ast.comments[0].end_line, 1);
        assert!(ast.comments[0].text.contains("one"));
        assert_eq!(ast.comments[1].start_line, 3);
        assert_eq!(ast.comments[1].end_line, 4);
    }

    #[test]
    fn test_jsx_extraction() {
        let ast = parse(
            "a.tsx",
            "const el = <Select multiple value={v} onChange={set}>\n  <Option />\n</Select>;\n",
        );
        assert_eq!(ast.jsx_elements.len(), 2);
        let select = &ast.jsx_elements[0];
        assert_eq!(select.tag_name, "Select");
        assert_eq!(select.attributes, vec!["multiple", "value", "onChange"]);
        assert_eq!(ast.jsx_elements[1].tag_name, "Option");
    }

    #[test]
    fn test_jsx_dotted_tag_and_comparison_guard() {
        let ast = parse("a.tsx", "if (a < B && c > d) {}\nreturn <Theme.Provider value={t} />;\n");
        assert_eq!(ast.jsx_elements.len(), 1);
        assert_eq!(ast.jsx_elements[0].tag_name, "Theme.Provider");
    }

    #[test]
    fn test_jsx_not_scanned_in_plain_ts() {
        let ast = parse("a.ts", "type X = A<B>;\nconst y = a < B ? 1 : 2;\n");
        assert!(ast.jsx_elements.is_empty());
    }
}
