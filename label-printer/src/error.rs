//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Printer is offline or unreachable
    #[error("Printer offline: {0}")]
    Offline(String),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration (unknown model, media, address)
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Image cannot be printed on the selected media
    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;

/// Label rendering error types
#[derive(Debug, Error)]
pub enum RenderError {
    /// Font file missing or unparsable
    #[error("Font error: {0}")]
    Font(String),

    /// Data cannot be represented as a QR symbol
    #[error("Code error: {0}")]
    Code(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
