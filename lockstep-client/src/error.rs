//! Error types for lockstep-client

use thiserror::Error;

/// Main error type for lockstep-client
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server rejected a command
    #[error("Server error: {0}")]
    Server(String),

    /// Malformed payload from the server
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using lockstep-client Error
pub type Result<T> = std::result::Result<T, Error>;
