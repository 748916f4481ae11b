//! Error types for the Wallbox API client.
//!
//! # Design
//! Every non-2xx response lands in `Http` with the raw status code and body.
//! There are no per-status variants: callers that care about 401 versus 500
//! match on `status` themselves. Nothing here is retried.

use thiserror::Error;

/// Errors returned by `WallboxClient` parse methods and the `Wallbox` session.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be deserialized into the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The transport could not complete the round-trip (connect error, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The client configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status of the failed response, if the error came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
