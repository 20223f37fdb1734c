//! Error types for newswatch.

use thiserror::Error;

/// Result type alias using newswatch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for newswatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Translation failed
    #[error("Translation error: {0}")]
    Translation(String),

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error represents upstream rate limiting and the
    /// operation that produced it should be retried after a backoff.
    ///
    /// Classification is message-based because the throttling signal
    /// arrives as free text from the provider: an HTTP 429 status, the
    /// OpenAI-style "Too Many Requests" phrase, or the Zhipu throttling
    /// marker "限流".
    pub fn is_rate_limited(&self) -> bool {
        is_rate_limited_message(&self.to_string())
    }
}

/// Message-level rate-limit classification, shared with stored error
/// strings that no longer carry their original error type.
pub fn is_rate_limited_message(message: &str) -> bool {
    message.contains("HTTP 429")
        || message.contains("Too Many Requests")
        || message.contains("限流")
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
