//! # Lockstep Common Library
//!
//! Shared code for the Lockstep server and client including:
//! - Room/queue data model
//! - Playback clock arithmetic
//! - Room event types (RoomEvent enum)
//! - API request/response types
//! - Utility functions

pub mod api;
pub mod clock;
pub mod events;
pub mod model;
pub mod time;

pub use model::{MediaKind, Member, PlaybackState, Track};
