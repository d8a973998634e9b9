//! tsconfig.json compiler options
//!
//! Reads the three options that affect resolution: `baseUrl`, `paths`
//! (aliases consulted as a pre-pass over import sources), and `jsx`.
//! tsconfig allows comments and trailing commas, so the content is cleaned
//! before JSON parsing. A malformed tsconfig degrades to defaults with a
//! warning; it never fails the run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompilerOptions {
    #[serde(rename = "baseUrl")]
    pub base_url: Option<String>,
    pub paths: BTreeMap<String, Vec<String>>,
    pub jsx: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TsConfig {
    #[serde(rename = "compilerOptions")]
    compiler_options: CompilerOptions,
}

/// Load compiler options from `tsconfig.json` (or `jsconfig.json`).
pub fn load(root: &Path) -> CompilerOptions {
    for name in ["tsconfig.json", "jsconfig.json"] {
        let path = root.join(name);
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        let cleaned = strip_jsonc(&content);
        match serde_json::from_str::<TsConfig>(&cleaned) {
            Ok(config) => {
                debug!(
                    "loaded {}: {} path aliases",
                    path.display(),
                    config.compiler_options.paths.len()
                );
                return config.compiler_options;
            }
            Err(e) => {
                warn!("ignoring malformed {}: {e}", path.display());
                return CompilerOptions::default();
            }
        }
    }
    CompilerOptions::default()
}

/// Strip `//` and `/* */` comments and trailing commas from JSONC.
fn strip_jsonc(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let mut in_string = false;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < bytes.len() {
                out.push(bytes[i + 1] as char);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            '/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            '/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            ',' => {
                // Drop the comma if the next non-whitespace closes a scope.
                let mut j = i + 1;
                while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                    j += 1;
                }
                if j < bytes.len() && (bytes[j] == b'}' || bytes[j] == b']') {
                    i += 1;
                } else {
                    out.push(c);
                    i += 1;
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}
