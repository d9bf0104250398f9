//! Unified error types for the aggregation engine.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the aggregation engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Structural input error (bad date string, missing tenant). Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A source query failed. `transient` marks errors worth retrying
    /// (timeouts, connection resets, decode failures); auth and syntax
    /// errors are not.
    #[error("source query failed: {message}")]
    Source { message: String, transient: bool },

    /// A statistics write failed.
    #[error("store write failed: {0}")]
    Sink(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a non-retryable source error.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source {
            message: msg.into(),
            transient: false,
        }
    }

    /// Create a retryable source error.
    pub fn source_transient(msg: impl Into<String>) -> Self {
        Self::Source {
            message: msg.into(),
            transient: true,
        }
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the query layer should retry this error with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Source { transient: true, .. })
    }
}
