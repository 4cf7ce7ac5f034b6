use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RateLimitError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid tier configuration: {0}")]
    InvalidTier(String),

    #[error("Redis connection error: {0}")]
    RedisConnectionError(#[from] redis::RedisError),

    #[error("Redis command error: {0}")]
    RedisCommandError(String),

    #[error("Script execution error: {0}")]
    ScriptExecutionError(String),

    #[error("Store command timed out after {0:?}")]
    StoreTimeout(Duration),

    #[error("File system error: {0}")]
    FileSystemError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl RateLimitError {
    /// Coarse classification used as a metric label on store failures.
    pub fn kind(&self) -> &'static str {
        match self {
            RateLimitError::RedisConnectionError(_) => "connection",
            RateLimitError::StoreTimeout(_) => "timeout",
            RateLimitError::RedisCommandError(_) | RateLimitError::ScriptExecutionError(_) => {
                "script"
            }
            _ => "other",
        }
    }
}

/// Result type alias for rate limiter operations
pub type Result<T> = std::result::Result<T, RateLimitError>;
