//! Error types for Underwriter.
//!
//! Library crates use [`UnderwriterError`] via `thiserror`.
//! The CLI wraps this with `color-eyre`; the HTTP API maps it to a status code
//! through [`UnderwriterError::http_status`].

use std::path::PathBuf;

/// Message shown when the model answered with no extractable text.
pub const EMPTY_RESULT_MESSAGE: &str = "Empty response from analysis engine. Please try again.";

/// Top-level error type for all Underwriter operations.
#[derive(Debug, thiserror::Error)]
pub enum UnderwriterError {
    /// Missing credential, missing instruction document, or a bad config file.
    /// Fatal for the request; never retried.
    #[error("{message}")]
    Config { message: String },

    /// Rejected input: oversized or unreadable attachment, incomplete intake form.
    #[error("{message}")]
    Validation { message: String },

    /// The model endpoint answered with a non-success status.
    #[error("Claude API error: {status} - {body}")]
    Upstream { status: u16, body: String },

    /// A remote analyze server answered with a non-success status. The message
    /// is the server's own `error` field, shown as-is.
    #[error("{message}")]
    Remote { status: u16, message: String },

    /// The model answered successfully but without any text content.
    #[error("{}", EMPTY_RESULT_MESSAGE)]
    EmptyResult,

    /// Transport-level HTTP failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Malformed JSON or text that could not be decoded.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, UnderwriterError>;

impl UnderwriterError {
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

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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

    /// HTTP status code reported to API callers for this error.
    ///
    /// Upstream failures keep the upstream's own status; validation failures
    /// are client errors; everything else is a 500.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Upstream { status, .. } | Self::Remote { status, .. } => *status,
            Self::Validation { .. } => 400,
            Self::Config { .. }
            | Self::EmptyResult
            | Self::Network(_)
            | Self::Parse { .. }
            | Self::Io { .. } => 500,
        }
    }
}
