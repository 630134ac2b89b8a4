//! Error types for the flow engine

use thiserror::Error;

/// Result type alias using FlowError
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors that can occur in the flow engine
#[derive(Debug, Error)]
pub enum FlowError {
    /// No step with this name exists in the tree
    #[error("Step not found: {0}")]
    StepNotFound(String),

    /// The selection cannot be copied, pasted or deleted as requested
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// A mutation would break a structural invariant of the tree
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The polling source could not be listed (network, auth, ...)
    #[error("Polling source unavailable: {0}")]
    SourceUnavailable(String),

    /// Cursor store failure
    #[error("Cursor store error: {0}")]
    Store(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowError {
    /// Create a not-found error for a step name
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::StepNotFound(name.into())
    }

    /// Create an invalid selection error with a message
    pub fn invalid_selection(msg: impl Into<String>) -> Self {
        Self::InvalidSelection(msg.into())
    }

    /// Create an invalid operation error with a message
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Create a source failure from any displayable error
    pub fn source_unavailable(err: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable(err.to_string())
    }

    /// Whether the scheduler should retry the call on its normal cadence
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_) | Self::Store(_) | Self::Io(_))
    }
}
