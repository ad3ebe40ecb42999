//! Error types for Tenderlens.
//!
//! Library crates use [`TenderlensError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Tenderlens operations.
#[derive(Debug, thiserror::Error)]
pub enum TenderlensError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Parsed-document tree could not be interpreted.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Embedding provider error (request, response shape, or transport).
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Completion provider error (request, response shape, or transport).
    #[error("completion error: {0}")]
    Completion(String),

    /// Index or chunk artifacts missing for a document identifier.
    ///
    /// Distinct from an empty result set: an empty ranked list is a valid
    /// answer, a missing index is not.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (embedding/chunk count mismatch, bad shapes).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TenderlensError>;

impl TenderlensError {
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

    /// Create a not-found error from any displayable message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound {
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

    /// Whether this is the NotFound variant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
