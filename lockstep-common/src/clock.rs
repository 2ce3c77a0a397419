//! Playback clock arithmetic
//!
//! Converts an anchor timestamp + pause offset into an elapsed-seconds value
//! at any instant, and applies the transport transitions that keep the
//! anchor consistent. All functions are pure with respect to wall-clock
//! time: the caller supplies `now_ms`.

use crate::model::PlaybackState;

impl PlaybackState {
    /// Elapsed seconds into the current source at `now_ms`
    ///
    /// While playing this is `(now - anchor) / 1000`; while paused it is the
    /// frozen pause offset. Never negative.
    pub fn elapsed(&self, now_ms: i64) -> f64 {
        match (self.playing, self.anchor_ms) {
            (true, Some(anchor)) => ((now_ms - anchor) as f64 / 1000.0).max(0.0),
            _ => self.paused_offset_secs.max(0.0),
        }
    }

    /// Resume playing from the paused offset
    ///
    /// Re-derives the anchor so that elapsed time continues exactly where
    /// the pause left it.
    pub fn resume(&mut self, now_ms: i64) {
        self.anchor_ms = Some(now_ms - (self.paused_offset_secs * 1000.0) as i64);
        self.playing = true;
    }

    /// Pause, freezing the current elapsed time into the pause offset
    pub fn pause(&mut self, now_ms: i64) {
        self.paused_offset_secs = self.elapsed(now_ms);
        self.anchor_ms = None;
        self.playing = false;
    }

    /// Seek to `target_secs`
    ///
    /// Returns false (no state change) for non-finite or negative targets.
    /// While playing the anchor is re-derived so elapsed time keeps
    /// advancing from the target with no play/pause discontinuity; while
    /// paused the anchor stays unset.
    pub fn seek(&mut self, target_secs: f64, now_ms: i64) -> bool {
        if !target_secs.is_finite() || target_secs < 0.0 {
            return false;
        }
        self.paused_offset_secs = target_secs;
        if self.playing {
            self.anchor_ms = Some(now_ms - (target_secs * 1000.0) as i64);
        }
        true
    }
}
