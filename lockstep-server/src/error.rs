//! Error types for lockstep-server
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Main error type for lockstep-server
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Command referenced a room that does not exist (or was torn down
    /// concurrently by the last member leaving)
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// Command referenced a member not present in the room
    #[error("Member not found: {0}")]
    MemberNotFound(String),

    /// Queue operation errors (unknown track, out-of-range index,
    /// navigation on an empty queue)
    #[error("Queue error: {0}")]
    Queue(String),

    /// Malformed command (missing fields, non-numeric seek offset)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using lockstep-server Error
pub type Result<T> = std::result::Result<T, Error>;
