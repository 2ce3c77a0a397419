//! # Lockstep Client Library
//!
//! Client-side half of the synchronization protocol: a capability trait
//! over player backends, the drift corrector that reconciles local playback
//! against authoritative snapshots, and the server session that wires both
//! to the room API.

pub mod corrector;
pub mod error;
pub mod player;
pub mod session;

pub use corrector::{Correction, DriftCorrector, Snapshot};
pub use error::{Error, Result};
pub use player::{PlayState, PlayerBackend, SimulatedPlayer, StateCallback};
pub use session::{Session, SessionConfig};
