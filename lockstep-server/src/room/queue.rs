//! Queue engine
//!
//! Ordered track list with current-index navigation. Every operation that
//! changes the selection re-anchors the playback state and returns the
//! events the caller must broadcast, keeping the engine testable
//! independent of the transport substrate.

use crate::error::{Error, Result};
use crate::room::state::RoomState;
use lockstep_common::events::RoomEvent;
use lockstep_common::model::{PlaybackState, Track};
use tracing::debug;
use uuid::Uuid;

impl RoomState {
    /// Append a track to the tail of the queue
    ///
    /// If nothing was selected (empty queue or explicitly cleared), the new
    /// track starts playing immediately.
    pub fn queue_append(&mut self, track: Track, now_ms: i64) -> (usize, Vec<RoomEvent>) {
        self.queue.push(track);
        let index = self.queue.len() - 1;

        if self.queue_index < 0 {
            // Nothing selected: autoplay the first arrival
            let events = self
                .queue_play_at(index, now_ms)
                .expect("freshly appended index is in bounds");
            return (index, events);
        }

        debug!(room = %self.room_id, index, "track appended");
        (index, vec![self.queue_updated_event()])
    }

    /// Remove a track by id
    ///
    /// Removing an entry before the current one shifts the index down.
    /// Removing the current entry plays its successor (now at the same
    /// index, clamped to the new tail), or clears playback entirely when
    /// the queue empties.
    pub fn queue_remove(&mut self, track_id: Uuid, now_ms: i64) -> Result<Vec<RoomEvent>> {
        let removed_index = self
            .queue
            .iter()
            .position(|t| t.id == track_id)
            .ok_or_else(|| Error::Queue(format!("no track {} in queue", track_id)))? as i64;

        self.queue.remove(removed_index as usize);

        if removed_index < self.queue_index {
            self.queue_index -= 1;
            return Ok(vec![self.queue_updated_event()]);
        }

        if removed_index > self.queue_index {
            return Ok(vec![self.queue_updated_event()]);
        }

        // Removed the current track
        if self.queue.is_empty() {
            self.queue_index = -1;
            self.playback = PlaybackState::cleared();
            debug!(room = %self.room_id, "queue emptied, playback cleared");
            return Ok(vec![self.queue_updated_event(), self.sync_state_event(now_ms)]);
        }

        let next = (self.queue_index).min(self.queue.len() as i64 - 1) as usize;
        self.queue_play_at(next, now_ms)
    }

    /// Select and play the track at `index`, re-anchored to its start
    pub fn queue_play_at(&mut self, index: usize, now_ms: i64) -> Result<Vec<RoomEvent>> {
        let track = self
            .queue
            .get(index)
            .ok_or_else(|| Error::Queue(format!("index {} out of range", index)))?;

        self.playback = PlaybackState::playing_from_start(track, now_ms);
        self.queue_index = index as i64;
        debug!(room = %self.room_id, index, track = %track.display_name, "playing queue entry");

        Ok(vec![self.track_changed_event(now_ms), self.queue_updated_event()])
    }

    /// User-initiated skip forward; wraps around at the tail
    pub fn queue_next(&mut self, now_ms: i64) -> Result<Vec<RoomEvent>> {
        self.queue_step(1, now_ms)
    }

    /// User-initiated skip backward; wraps around at the head
    pub fn queue_prev(&mut self, now_ms: i64) -> Result<Vec<RoomEvent>> {
        self.queue_step(-1, now_ms)
    }

    fn queue_step(&mut self, delta: i64, now_ms: i64) -> Result<Vec<RoomEvent>> {
        if self.queue.is_empty() {
            return Err(Error::Queue("cannot navigate an empty queue".to_string()));
        }
        let len = self.queue.len() as i64;
        let next = (self.queue_index + delta).rem_euclid(len) as usize;
        self.queue_play_at(next, now_ms)
    }

    /// Server-side auto-advance on a client's "track finished" signal
    ///
    /// Advances without wraparound: at the tail, playback stops instead of
    /// looping (manual next loops, natural end does not). Multiple members
    /// report the same end independently; the signal is processed only when
    /// `ended_index` still matches the room's current index, so duplicates
    /// cannot double-advance the queue.
    pub fn on_track_ended(&mut self, ended_index: i64, now_ms: i64) -> Vec<RoomEvent> {
        if self.queue_index < 0 || ended_index != self.queue_index {
            debug!(
                room = %self.room_id,
                ended_index,
                current = self.queue_index,
                "stale track-ended signal discarded"
            );
            return Vec::new();
        }

        let next = self.queue_index + 1;
        if (next as usize) < self.queue.len() {
            return self
                .queue_play_at(next as usize, now_ms)
                .expect("bounds checked above");
        }

        // Natural end of the playlist: stop, don't loop
        self.playback.playing = false;
        self.playback.anchor_ms = None;
        self.playback.paused_offset_secs = 0.0;
        debug!(room = %self.room_id, "playlist finished, playback stopped");
        vec![self.sync_state_event(now_ms)]
    }
}
