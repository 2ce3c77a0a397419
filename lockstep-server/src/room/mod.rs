//! Room synchronization engine
//!
//! One room owns its members (in join order), its ordered track queue, and
//! the authoritative playback state. All mutations for a room are
//! serialized through the room's mutex; broadcasts are fire-and-forget.

pub mod broadcaster;
pub mod queue;
pub mod registry;
pub mod state;
pub mod transport;

pub use registry::{Room, RoomRegistry};
pub use state::RoomState;
