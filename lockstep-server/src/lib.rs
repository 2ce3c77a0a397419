//! # Lockstep Server Library
//!
//! Room synchronization service: server-authoritative playback clock,
//! transport state machine, ordered track queue, and host-failover
//! membership, exposed over an HTTP/SSE control interface.

pub mod api;
pub mod config;
pub mod error;
pub mod room;

pub use error::{Error, Result};
pub use room::registry::RoomRegistry;
