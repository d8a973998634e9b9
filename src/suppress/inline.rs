//! Inline suppression directives
//!
//! Three comment forms are recognized:
//!
//! - `doxy-ignore <kind>[ -- reason]` applies to the next source line
//! - `doxy-ignore-line <kind>[ -- reason]` applies to the current line
//! - `doxy-ignore-start <kind>` ... `doxy-ignore-end` applies to the
//!   closed line range
//!
//! `<kind>` is one of the six violation kinds or `*`. The reason separator
//! may be `--`, an em/en dash, or `:`. Directives with unknown kinds are
//! ignored without error; an unterminated start block runs to end of file.

use crate::ast::CommentSpan;
use crate::models::FindingKind;
use serde::{Deserialize, Serialize};

/// Which finding kinds a directive covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KindFilter {
    #[serde(rename = "*")]
    Any,
    #[serde(untagged)]
    Kind(FindingKind),
}

impl KindFilter {
    pub fn matches(self, kind: FindingKind) -> bool {
        match self {
            KindFilter::Any => true,
            KindFilter::Kind(k) => k == kind,
        }
    }
}

/// A parsed inline suppression covering a closed line range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSuppression {
    pub kind: KindFilter,
    pub reason: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
}

impl InlineSuppression {
    pub fn contains(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// Parse all directives out of a file's comments.
pub fn parse_inline(comments: &[CommentSpan]) -> Vec<InlineSuppression> {
    let mut suppressions = Vec::new();
    // Open `doxy-ignore-start` blocks waiting for their end.
    let mut open_blocks: Vec<InlineSuppression> = Vec::new();

    for comment in comments {
        let Some(idx) = comment.text.find("doxy-ignore") else {
            continue;
        };
        let rest = &comment.text[idx + "doxy-ignore".len()..];

        if let Some(rest) = rest.strip_prefix("-start") {
            if let Some((kind, reason)) = parse_kind_and_reason(rest) {
                open_blocks.push(InlineSuppression {
                    kind,
                    reason,
                    start_line: comment.start_line,
                    end_line: u32::MAX,
                });
            }
        } else if rest.starts_with("-end") {
            if let Some(mut block) = open_blocks.pop() {
                block.end_line = comment.end_line;
                suppressions.push(block);
            }
        } else if let Some(rest) = rest.strip_prefix("-line") {
            if let Some((kind, reason)) = parse_kind_and_reason(rest) {
                suppressions.push(InlineSuppression {
                    kind,
                    reason,
                    start_line: comment.start_line,
                    end_line: comment.start_line,
                });
            }
        } else if let Some((kind, reason)) = parse_kind_and_reason(rest) {
            // Bare form: the next source line.
            suppressions.push(InlineSuppression {
                kind,
                reason,
                start_line: comment.end_line + 1,
                end_line: comment.end_line + 1,
            });
        }
    }

    // Unterminated blocks extend to EOF.
    suppressions.extend(open_blocks);
    suppressions.sort_by_key(|s| (s.start_line, s.end_line));
    suppressions
}

/// `" deprecated-api -- migrating in #142 "` -> kind + reason.
fn parse_kind_and_reason(rest: &str) -> Option<(KindFilter, Option<String>)> {
    let rest = rest.trim_start_matches(|c: char| c == ':').trim();
    let rest = rest.trim_end_matches("*/").trim();
    let mut parts = rest.splitn(2, char::is_whitespace);
    let kind_token = parts.next()?.trim_matches(':');
    if kind_token.is_empty() {
        return None;
    }

    let kind = if kind_token == "*" {
        KindFilter::Any
    } else {
        KindFilter::Kind(FindingKind::parse(kind_token)?)
    };

    let reason = parts.next().map(str::trim).and_then(|r| {
        let r = r
            .trim_start_matches("--")
            .trim_start_matches('\u{2014}')
            .trim_start_matches('\u{2013}')
            .trim_start_matches(':')
            .trim();
        if r.is_empty() {
            None
        } else {
            Some(r.to_string())
        }
    });

    Some((kind, reason))
}

/// The first suppression containing `line` with a matching kind.
pub fn find_match<'a>(
    suppressions: &'a [InlineSuppression],
    line: u32,
    kind: FindingKind,
) -> Option<&'a InlineSuppression> {
    suppressions
        .iter()
        .find(|s| s.contains(line) && s.kind.matches(kind))
}
