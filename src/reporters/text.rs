//! Terminal reporter

use crate::models::{Finding, Severity};
use crate::pipeline::RunResult;
use anyhow::Result;
use console::style;
use std::fmt::Write;

pub struct TextReporter {
    color: bool,
}

impl TextReporter {
    pub fn new() -> Self {
        Self {
            color: console::colors_enabled(),
        }
    }

    pub fn without_color() -> Self {
        Self { color: false }
    }

    pub fn render(&self, result: &RunResult, findings: &[&Finding]) -> Result<String> {
        let mut out = String::new();

        if findings.is_empty() {
            writeln!(out, "No API compatibility issues found.")?;
            self.write_footer(&mut out, result)?;
            return Ok(out);
        }

        let mut current_file: Option<&str> = None;
        for finding in findings {
            if current_file != Some(finding.location.file.as_str()) {
                if current_file.is_some() {
                    writeln!(out)?;
                }
                writeln!(out, "{}", self.styled_file(&finding.location.file))?;
                current_file = Some(finding.location.file.as_str());
            }

            let severity = self.styled_severity(finding.severity);
            let suppressed = match &finding.suppressed {
                Some(info) => format!("  [suppressed: {:?}]", info.source).to_lowercase(),
                None => String::new(),
            };
            writeln!(
                out,
                "  {}:{}  {severity}  {}  {}  {}{suppressed}",
                finding.location.line,
                finding.location.column,
                finding.kind,
                finding.id,
                finding.message,
            )?;
            for fix in &finding.fixes {
                match &fix.reference_url {
                    Some(url) => writeln!(out, "      fix: {} ({url})", fix.description)?,
                    None => writeln!(out, "      fix: {}", fix.description)?,
                }
            }
        }

        writeln!(out)?;
        self.write_footer(&mut out, result)?;
        Ok(out)
    }

    fn write_footer(&self, out: &mut String, result: &RunResult) -> Result<()> {
        let s = &result.summary;
        writeln!(
            out,
            "{} error(s), {} warning(s), {} info ({} suppressed) \u{2022} {} analyzed, {} cached \u{2022} {}ms",
            s.errors,
            s.warnings,
            s.infos,
            s.suppressed,
            result.stats.to_analyze,
            result.stats.from_cache,
            result.duration_ms
        )?;
        Ok(())
    }

    fn styled_file(&self, file: &str) -> String {
        if self.color {
            style(file).bold().underlined().to_string()
        } else {
            file.to_string()
        }
    }

    fn styled_severity(&self, severity: Severity) -> String {
        if !self.color {
            return severity.to_string();
        }
        match severity {
            Severity::Error => style("error").red().bold().to_string(),
            Severity::Warning => style("warning").yellow().bold().to_string(),
            Severity::Info => style("info").dim().to_string(),
        }
    }
}

impl Default for TextReporter {
    fn default() -> Self {
        Self::new()
    }
}
