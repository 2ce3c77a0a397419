//! Room event types
//!
//! Events are broadcast per room and serialized for SSE transmission. All
//! server→client messages use this central enum for type safety and
//! exhaustive matching.

use crate::model::{Member, PlaybackState, Track};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Room-scoped events broadcast to members
///
/// Broadcasts are fire-and-forget and at-most-once; clients that miss one
/// reconcile through the periodic heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoomEvent {
    /// A member joined the room
    ///
    /// Triggers:
    /// - SSE: Update member list
    UserJoined {
        /// The member that joined
        member: Member,
        /// Full member list after the join, in join order
        members: Vec<Member>,
        /// When the join happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A member left the room
    ///
    /// Triggers:
    /// - SSE: Update member list
    UserLeft {
        /// Id of the member that left
        member_id: Uuid,
        /// Display name of the member that left
        display_name: String,
        /// Full member list after the departure, in join order
        members: Vec<Member>,
        /// When the departure happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Host failover notice, addressed to exactly one member
    ///
    /// Emitted when the previous host left and host status transferred to
    /// the earliest-still-present joiner.
    PromotedToHost {
        /// The member being promoted; other subscribers must not receive
        /// this event
        target: Uuid,
        /// When the promotion happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new track was selected (distinct from a transport change)
    ///
    /// Triggers:
    /// - Client: reload the player with the new source, then seek/play
    TrackChanged {
        /// Full playback state for the new track
        state: PlaybackState,
        /// Elapsed seconds at `server_time` (zero for a fresh start)
        elapsed: f64,
        /// Server epoch milliseconds when the snapshot was taken
        server_time: i64,
        /// Queue position of the new track
        queue_index: i64,
    },

    /// Authoritative state snapshot after a transport command
    ///
    /// Triggers:
    /// - Client: drift-correct local playback against `elapsed`
    SyncState {
        /// Full playback state
        state: PlaybackState,
        /// Elapsed seconds at `server_time`
        elapsed: f64,
        /// Server epoch milliseconds when the snapshot was taken
        server_time: i64,
    },

    /// Queue snapshot after any queue mutation
    QueueUpdated {
        /// Full ordered queue
        queue: Vec<Track>,
        /// Current queue position, -1 when nothing is selected
        queue_index: i64,
    },
}

impl RoomEvent {
    /// Get event type as string, used as the SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            RoomEvent::UserJoined { .. } => "UserJoined",
            RoomEvent::UserLeft { .. } => "UserLeft",
            RoomEvent::PromotedToHost { .. } => "PromotedToHost",
            RoomEvent::TrackChanged { .. } => "TrackChanged",
            RoomEvent::SyncState { .. } => "SyncState",
            RoomEvent::QueueUpdated { .. } => "QueueUpdated",
        }
    }

    /// For targeted events, the single member id allowed to receive them
    pub fn target(&self) -> Option<Uuid> {
        match self {
            RoomEvent::PromotedToHost { target, .. } => Some(*target),
            _ => None,
        }
    }
}
