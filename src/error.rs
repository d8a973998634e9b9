//! Error types and exit-code constants for doxy.
//!
//! Every failure the tool can surface belongs to one of a small set of
//! kinds, and each kind maps to a stable process exit code:
//!
//! - `2`: configuration errors (bad config file, invalid flags)
//! - `3`: project errors (unreadable manifest, unparsable lockfile)
//! - `4`: authority-data errors (missing, malformed, schema-failing)
//! - `5`: internal errors (bugs, unexpected I/O failures)
//!
//! Exit `1` is reserved for the "findings present" outcome, which is a
//! classification result rather than a thrown failure, and exit `0` means a
//! clean run. Load-time errors (config, authority) are fatal before any
//! analysis starts; per-file parse failures are contained as internal info
//! findings and never abort the run.

use thiserror::Error;

/// Process exit codes, including the non-error outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// No findings at or above the fail-on threshold.
    Clean = 0,
    /// At least one non-suppressed finding at or above the fail-on threshold.
    FindingsPresent = 1,
    /// Invalid configuration or unreadable configuration file.
    ConfigError = 2,
    /// Unreadable manifest, unparsable lockfile, unreadable source tree.
    ProjectError = 3,
    /// Missing, malformed, or schema-failing authority data.
    AuthorityError = 4,
    /// Parser crash, bug, unexpected I/O failure.
    InternalError = 5,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as u8 as i32
    }
}

/// Unified error type for the doxy CLI and library boundary.
///
/// Application code uses `anyhow::Result` internally; errors that must route
/// to a specific exit code are constructed as (or wrapped in) a `DoxyError`
/// and downcast at the boundary.
#[derive(Debug, Error)]
pub enum DoxyError {
    /// Invalid configuration or unreadable configuration file.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unreadable manifest, unparsable lockfile, unreadable source tree.
    #[error("project error: {0}")]
    Project(String),

    /// Missing, malformed, or schema-failing authority data.
    #[error("authority data error: {0}")]
    Authority(String),

    /// Bugs and unexpected failures, with a stable code for bug reports.
    #[error("internal error [{code}]: {message}")]
    Internal { code: &'static str, message: String },
}

impl DoxyError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            DoxyError::Config(_) => ExitCode::ConfigError,
            DoxyError::Project(_) => ExitCode::ProjectError,
            DoxyError::Authority(_) => ExitCode::AuthorityError,
            DoxyError::Internal { .. } => ExitCode::InternalError,
        }
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        DoxyError::Internal {
            code,
            message: message.into(),
        }
    }
}

/// Map an `anyhow::Error` chain to an exit code.
///
/// Walks the chain looking for a `DoxyError`; anything else is an internal
/// failure.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(doxy) = cause.downcast_ref::<DoxyError>() {
            return doxy.exit_code().as_i32();
        }
    }
    ExitCode::InternalError.as_i32()
}
