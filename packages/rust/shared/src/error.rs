//! Error types for rosterscrape.
//!
//! Library crates use [`RosterError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all rosterscrape operations.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The target page could not be loaded. Always fatal for a run.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// A browser session operation (script evaluation, click, scroll) failed.
    #[error("browser error: {0}")]
    Browser(String),

    /// Selector or snapshot parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON/CSV serialization error while writing artifacts.
    #[error("export error: {0}")]
    Export(String),

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RosterError>;

impl RosterError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = RosterError::config("panel_min_chars must be below panel_max_chars");
        assert_eq!(
            err.to_string(),
            "config error: panel_min_chars must be below panel_max_chars"
        );

        let err = RosterError::Navigation("timed out after 60000ms".into());
        assert!(err.to_string().contains("60000ms"));
    }
}
