//! Error types for agentwatch-store

use thiserror::Error;

/// Store error type
#[derive(Debug, Error)]
pub enum Error {
    /// Incoming event is missing a required field or is malformed
    #[error("validation error: {0}")]
    Validation(String),

    /// Event not found
    #[error("event not found: {0}")]
    NotFound(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than the store
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
