//! Client error types

use thiserror::Error;

/// Client error type
///
/// Every variant is a remote failure; none of them says anything about
/// whether a ticket was printed.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("{path} returned {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    /// Body could not be decoded into the expected record
    #[error("Invalid response from {path}: {reason}")]
    InvalidResponse { path: String, reason: String },

    /// Invalid client configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
