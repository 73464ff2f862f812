//! Error types for agentwatch-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Message broker connection or subscription failure
    #[error("broker error: {0}")]
    Broker(String),

    /// External key-space read failure
    #[error("keyspace error: {0}")]
    KeySpace(String),

    /// The hub no longer accepts connections
    #[error("shutting down")]
    ShuttingDown,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Event log error
    #[error("store error: {0}")]
    Store(#[from] agentwatch_store::Error),
}

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Self::KeySpace(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
