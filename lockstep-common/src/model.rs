//! Room data model shared between server and client
//!
//! The server process exclusively owns and mutates this state; clients hold
//! read-only projections reconciled through drift correction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of media a track refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// A stored media file, served by the file-storage collaborator
    File,
    /// An externally hosted stream, played by an embedded player
    Stream,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::File => write!(f, "file"),
            MediaKind::Stream => write!(f, "stream"),
        }
    }
}

/// One entry in a room's playback queue
///
/// Immutable once created; removed only by an explicit queue-remove.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Stable server-generated id
    pub id: Uuid,
    pub media_kind: MediaKind,
    /// Opaque reference into the file-storage collaborator (file URL) or
    /// external stream id; this core never interprets it
    pub source_ref: String,
    pub display_name: String,
    /// Member who enqueued the track
    pub added_by: Uuid,
}

/// A room member as seen by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub display_name: String,
    /// Exactly one member has this set whenever the room is non-empty
    pub is_host: bool,
}

/// Authoritative playback state for one room
///
/// Invariant: `anchor_ms` is `Some` iff `playing` is true. Elapsed time is
/// derived from this pair by [`PlaybackState::elapsed`](crate::clock), never
/// stored while playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// None when nothing is loaded (empty queue / cleared)
    pub media_kind: Option<MediaKind>,
    pub source_ref: Option<String>,
    pub display_name: Option<String>,
    pub playing: bool,
    /// Server epoch milliseconds at which elapsed time would have been zero
    pub anchor_ms: Option<i64>,
    /// Frozen elapsed seconds while paused; always >= 0
    pub paused_offset_secs: f64,
}

impl PlaybackState {
    /// State with nothing loaded
    pub fn cleared() -> Self {
        Self {
            media_kind: None,
            source_ref: None,
            display_name: None,
            playing: false,
            anchor_ms: None,
            paused_offset_secs: 0.0,
        }
    }

    /// State anchored at the start of `track`, playing from zero
    pub fn playing_from_start(track: &Track, now_ms: i64) -> Self {
        Self {
            media_kind: Some(track.media_kind),
            source_ref: Some(track.source_ref.clone()),
            display_name: Some(track.display_name.clone()),
            playing: true,
            anchor_ms: Some(now_ms),
            paused_offset_secs: 0.0,
        }
    }

    /// Whether any source is loaded
    pub fn is_loaded(&self) -> bool {
        self.source_ref.is_some()
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::cleared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleared_state() {
        let state = PlaybackState::cleared();
        assert!(!state.playing);
        assert!(state.anchor_ms.is_none());
        assert!(!state.is_loaded());
        assert_eq!(state.paused_offset_secs, 0.0);
    }

    #[test]
    fn test_playing_from_start() {
        let track = Track {
            id: Uuid::new_v4(),
            media_kind: MediaKind::File,
            source_ref: "/media/song.mp3".to_string(),
            display_name: "Song".to_string(),
            added_by: Uuid::new_v4(),
        };
        let state = PlaybackState::playing_from_start(&track, 1_000_000);
        assert!(state.playing);
        assert_eq!(state.anchor_ms, Some(1_000_000));
        assert_eq!(state.source_ref.as_deref(), Some("/media/song.mp3"));
        assert_eq!(state.paused_offset_secs, 0.0);
    }

    #[test]
    fn test_media_kind_serialization() {
        let json = serde_json::to_string(&MediaKind::Stream).unwrap();
        assert_eq!(json, "\"stream\"");
        let kind: MediaKind = serde_json::from_str("\"file\"").unwrap();
        assert_eq!(kind, MediaKind::File);
    }
}
