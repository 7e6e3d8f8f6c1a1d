//! Error types for wikiport.
//!
//! Library crates use [`WikiportError`] via `thiserror`.
//! App crates (cli) wrap this with `color-eyre` for rich diagnostics.
//!
//! Degraded-content conditions (a wiki page that fails to fetch, a renderer
//! that falls back to an error artifact) are deliberately *not* represented
//! here — they are absorbed as placeholder text where they occur and only
//! surface through logs.

use std::path::PathBuf;

use crate::types::{FileId, JobId};

/// Top-level error type for all wikiport operations.
#[derive(Debug, thiserror::Error)]
pub enum WikiportError {
    /// A referenced export job does not exist.
    #[error("export job {0} not found")]
    JobNotFound(JobId),

    /// A referenced export file does not exist.
    #[error("export file {0} not found")]
    FileNotFound(FileId),

    /// The repository URL is not a recognizable GitHub repository reference.
    #[error("invalid repository URL: {message}")]
    InvalidRepository { message: String },

    /// A job status transition that the lifecycle does not permit.
    #[error("invalid job transition: {message}")]
    InvalidTransition { message: String },

    /// Network/HTTP error talking to the content host.
    #[error("network error: {0}")]
    Network(String),

    /// Database or blob storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Export rendering error (absorbed by the renderers; see module docs).
    #[error("render error: {0}")]
    Render(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WikiportError>;

impl WikiportError {
    /// Create an invalid-repository error from any displayable message.
    pub fn invalid_repository(msg: impl Into<String>) -> Self {
        Self::InvalidRepository {
            message: msg.into(),
        }
    }

    /// Create an invalid-transition error from any displayable message.
    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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
        let err = WikiportError::invalid_repository("not a GitHub URL: ftp://x");
        assert_eq!(
            err.to_string(),
            "invalid repository URL: not a GitHub URL: ftp://x"
        );

        let id = JobId::new();
        let err = WikiportError::JobNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
