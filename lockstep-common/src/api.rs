//! API request/response types
//!
//! JSON bodies for the room command endpoints. Server→client broadcasts use
//! [`RoomEvent`](crate::events::RoomEvent) instead.

use crate::model::{MediaKind, Member, PlaybackState, Track};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transport command actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportAction {
    Play,
    Pause,
    Seek,
}

/// POST /api/rooms/:room_id/join
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub display_name: String,
}

/// Full snapshot returned to a joining member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomJoined {
    pub room_id: String,
    /// Server-assigned id the member uses on every subsequent command
    pub member_id: Uuid,
    pub is_host: bool,
    pub members: Vec<Member>,
    pub state: PlaybackState,
    /// Elapsed seconds at `server_time`
    pub elapsed: f64,
    pub server_time: i64,
    pub queue: Vec<Track>,
    pub queue_index: i64,
}

/// Request carrying only the sender's member id (leave, heartbeat,
/// queue-next, queue-prev)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRequest {
    pub member_id: Uuid,
}

/// POST /api/rooms/:room_id/transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportRequest {
    pub member_id: Uuid,
    pub action: TransportAction,
    /// Target seconds, required for seek
    #[serde(default)]
    pub offset: Option<f64>,
}

/// POST /api/rooms/:room_id/play and /queue/add
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub member_id: Uuid,
    pub media_kind: MediaKind,
    pub source_ref: String,
    pub display_name: String,
}

/// Response to /queue/add
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResponse {
    /// Index the track was appended at
    pub index: usize,
}

/// POST /api/rooms/:room_id/queue/remove
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRemoveRequest {
    pub member_id: Uuid,
    pub track_id: Uuid,
}

/// POST /api/rooms/:room_id/queue/play
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePlayRequest {
    pub member_id: Uuid,
    pub index: usize,
}

/// POST /api/rooms/:room_id/track-ended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackEndedRequest {
    pub member_id: Uuid,
    /// Queue index that was playing when the client observed the end;
    /// the server discards the signal if it no longer matches
    pub ended_index: i64,
}

/// Reply to POST /api/rooms/:room_id/heartbeat
///
/// Carries enough of the authoritative snapshot for uniform drift
/// correction even when SSE broadcasts were lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatAck {
    pub media_kind: Option<MediaKind>,
    pub source_ref: Option<String>,
    pub display_name: Option<String>,
    pub playing: bool,
    pub elapsed: f64,
    pub server_time: i64,
}

/// One row of GET /api/rooms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDirectoryEntry {
    pub room_id: String,
    pub member_count: usize,
}

/// Generic status body used for error responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}
