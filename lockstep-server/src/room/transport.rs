//! Transport state machine
//!
//! Applies play/pause/seek commands to a room's playback state. All
//! commands are permitted from either state; conflicting commands from
//! different members resolve last-writer-wins in arrival order, and
//! convergence is guaranteed by the broadcast snapshot plus heartbeats
//! rather than command sequencing.

use crate::error::{Error, Result};
use crate::room::state::RoomState;
use lockstep_common::api::TransportAction;
use lockstep_common::events::RoomEvent;
use tracing::debug;

impl RoomState {
    /// Apply a transport command and return the snapshot to broadcast
    ///
    /// Rejected commands (seek without a valid offset) leave the state
    /// untouched and produce no broadcast.
    pub fn apply_transport(
        &mut self,
        action: TransportAction,
        offset: Option<f64>,
        now_ms: i64,
    ) -> Result<RoomEvent> {
        match action {
            TransportAction::Play => {
                self.playback.resume(now_ms);
            }
            TransportAction::Pause => {
                self.playback.pause(now_ms);
            }
            TransportAction::Seek => {
                let target = offset
                    .ok_or_else(|| Error::BadRequest("seek requires an offset".to_string()))?;
                if !self.playback.seek(target, now_ms) {
                    return Err(Error::BadRequest(format!("invalid seek offset {target}")));
                }
            }
        }

        debug!(room = %self.room_id, ?action, playing = self.playback.playing, "transport applied");
        Ok(self.sync_state_event(now_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_common::model::{MediaKind, Track};
    use uuid::Uuid;

    fn room_playing_since(anchor_ms: i64) -> RoomState {
        let mut room = RoomState::new("test".to_string());
        room.queue_append(
            Track {
                id: Uuid::new_v4(),
                media_kind: MediaKind::Stream,
                source_ref: "dQw4w9WgXcQ".to_string(),
                display_name: "Video".to_string(),
                added_by: Uuid::new_v4(),
            },
            anchor_ms,
        );
        room
    }

    #[test]
    fn test_pause_freezes_elapsed() {
        let mut room = room_playing_since(0);
        let event = room.apply_transport(TransportAction::Pause, None, 45_000).unwrap();

        assert!(!room.playback.playing);
        assert!((room.playback.paused_offset_secs - 45.0).abs() < 1e-9);
        match event {
            RoomEvent::SyncState { elapsed, state, .. } => {
                assert!((elapsed - 45.0).abs() < 1e-9);
                assert!(!state.playing);
            }
            _ => panic!("expected SyncState"),
        }
    }

    #[test]
    fn test_play_resumes_from_pause_offset() {
        let mut room = room_playing_since(0);
        room.apply_transport(TransportAction::Pause, None, 30_000).unwrap();
        room.apply_transport(TransportAction::Play, None, 90_000).unwrap();

        assert!(room.playback.playing);
        assert!((room.playback.elapsed(90_000) - 30.0).abs() < 0.001);
    }

    #[test]
    fn test_seek_broadcasts_new_position() {
        let mut room = room_playing_since(0);
        let event = room
            .apply_transport(TransportAction::Seek, Some(200.0), 10_000)
            .unwrap();

        match event {
            RoomEvent::SyncState { elapsed, .. } => assert!((elapsed - 200.0).abs() < 1e-9),
            _ => panic!("expected SyncState"),
        }
        assert!(room.playback.playing);
    }

    #[test]
    fn test_invalid_seek_rejected_without_mutation() {
        let mut room = room_playing_since(0);
        let before = room.playback.clone();

        assert!(room.apply_transport(TransportAction::Seek, None, 10_000).is_err());
        assert!(room
            .apply_transport(TransportAction::Seek, Some(-3.0), 10_000)
            .is_err());
        assert!(room
            .apply_transport(TransportAction::Seek, Some(f64::NAN), 10_000)
            .is_err());
        assert_eq!(room.playback, before);
    }

    #[test]
    fn test_last_writer_wins() {
        let mut room = room_playing_since(0);
        // Two members race: pause then play; arrival order decides
        room.apply_transport(TransportAction::Pause, None, 10_000).unwrap();
        room.apply_transport(TransportAction::Play, None, 10_005).unwrap();
        assert!(room.playback.playing);
    }
}
