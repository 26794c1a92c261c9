//! Error types for pressroom.
//!
//! Library crates use [`PressroomError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all pressroom operations.
#[derive(Debug, thiserror::Error)]
pub enum PressroomError {
    /// Configuration loading or validation error, including missing credentials.
    #[error("config error: {message}")]
    Config { message: String },

    /// Persisted index (libSQL) error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Embedding capability failure (transport, auth, or malformed response).
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Generation capability failure.
    #[error("generation error: {0}")]
    Generation(String),

    /// A single corpus document could not be read or decoded.
    #[error("ingestion error for {path:?}: {message}")]
    Ingestion { path: PathBuf, message: String },

    /// Topic history could not be written.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The stage graph is malformed (detected at construction time).
    #[error("graph error: {message}")]
    Graph { message: String },

    /// A pipeline stage failed; fatal for the run.
    #[error("stage {stage} failed: {message}")]
    Stage { stage: u32, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (invalid format, bad parameters, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PressroomError>;

impl PressroomError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a graph error from any displayable message.
    pub fn graph(msg: impl Into<String>) -> Self {
        Self::Graph {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an ingestion error for a document path.
    pub fn ingestion(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Ingestion {
            path: path.into(),
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
