//! Error types for cluster module

use thiserror::Error;

/// Cluster error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Disconnected: {0}")]
    Disconnected(String),

    #[error("Relay already started")]
    AlreadyStarted,
}

/// Result type for cluster operations
pub type Result<T> = std::result::Result<T, Error>;
