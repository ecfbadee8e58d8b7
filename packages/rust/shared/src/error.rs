//! Error types for the campus-services data layer.
//!
//! Library crates use [`CampusError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all campus-services operations.
#[derive(Debug, thiserror::Error)]
pub enum CampusError {
    /// Retrieval did not complete with a success status (network or static file).
    #[error("fetch error: {url}: {message}")]
    Fetch { url: String, message: String },

    /// The remote source answered, but its envelope reported a failure.
    #[error("api error (code {code}): {message}")]
    Api { code: i64, message: String },

    /// A document (CSV or JSON body) could not be parsed at all.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Caller-supplied input was rejected before any I/O happened.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CampusError>;

impl CampusError {
    /// Create a fetch error for `url`.
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create an API error. An empty server message falls back to `fallback`.
    pub fn api(code: i64, message: &str, fallback: &str) -> Self {
        let message = if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message.to_string()
        };
        Self::Api { code, message }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    /// Whether this error is one of the catalog load failures (fetch, api, parse).
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::Api { .. } | Self::Parse { .. }
        )
    }
}
