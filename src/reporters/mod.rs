//! Output reporters
//!
//! Findings are the sole content of standard output; everything else goes
//! to stderr. Three formats:
//! - `text` - human-oriented console output with colors
//! - `json` - machine-readable report
//! - `sarif` - SARIF 2.1.0 for code-scanning integrations

mod json;
mod sarif;
mod text;

use crate::models::Finding;
use crate::pipeline::RunResult;
use anyhow::{anyhow, Result};
use std::str::FromStr;

pub use json::JsonReporter;
pub use sarif::SarifReporter;
pub use text::TextReporter;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Sarif,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "sarif" => Ok(OutputFormat::Sarif),
            other => Err(anyhow!(
                "unknown output format '{other}' (expected text, json, or sarif)"
            )),
        }
    }
}

/// Render the run result in the chosen format.
pub fn render(
    format: OutputFormat,
    result: &RunResult,
    findings: &[&Finding],
) -> Result<String> {
    match format {
        OutputFormat::Text => TextReporter::new().render(result, findings),
        OutputFormat::Json => JsonReporter.render(result, findings),
        OutputFormat::Sarif => SarifReporter.render(findings),
    }
}
