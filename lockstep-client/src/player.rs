//! Player backend abstraction
//!
//! The session and drift corrector never talk to a concrete player
//! directly; they go through [`PlayerBackend`] so the correction logic is
//! testable without real media output. [`SimulatedPlayer`] is the built-in
//! backend: a wall-clock-driven position with no audio, good enough to
//! hold a seat in a room and exercise the whole protocol.

use std::time::Instant;

use lockstep_common::MediaKind;

/// Coarse player state as seen by the corrector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
    /// Position reached the end of a finite source
    Ended,
}

/// Callback invoked on every play-state transition
pub type StateCallback = Box<dyn FnMut(PlayState) + Send>;

/// Capability trait over local playback
///
/// Implementations must keep `current_time` monotonic while playing and
/// honor seeks immediately; the corrector assumes both. State transitions
/// are reported through the registered callback, including the passive
/// transition to [`PlayState::Ended`].
pub trait PlayerBackend: Send {
    /// Replace the loaded source. Resets position to zero and pauses.
    fn load(&mut self, media_kind: MediaKind, source_ref: &str, display_name: &str);

    fn play(&mut self);

    fn pause(&mut self);

    /// Jump to an absolute position in seconds
    fn seek_to(&mut self, seconds: f64);

    /// Current position in seconds, 0.0 when nothing is loaded
    fn current_time(&self) -> f64;

    /// Total length in seconds, if known
    fn duration(&self) -> Option<f64>;

    fn play_state(&self) -> PlayState;

    /// The loaded source, if any
    fn current_source(&self) -> Option<(MediaKind, &str)>;

    /// Register the state-change callback; replaces any previous one
    fn set_on_state_change(&mut self, callback: StateCallback);

    /// Give the backend a chance to detect passive transitions (a finite
    /// source running out); called periodically by the session
    fn poll(&mut self) {}
}

/// Clock-driven player with no media output
///
/// Position advances with wall time while playing. An optional duration
/// makes the player report [`PlayState::Ended`] once the position passes
/// it, which lets tests and the demo binary drive auto-advance.
pub struct SimulatedPlayer {
    source: Option<(MediaKind, String)>,
    display_name: Option<String>,
    /// Set while playing; position = offset + (now - anchor)
    anchor: Option<Instant>,
    /// Position at the last pause/seek/load
    offset_secs: f64,
    duration: Option<f64>,
    on_state_change: Option<StateCallback>,
    last_notified: Option<PlayState>,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self {
            source: None,
            display_name: None,
            anchor: None,
            offset_secs: 0.0,
            duration: None,
            on_state_change: None,
            last_notified: None,
        }
    }

    /// Pretend every loaded source has this length
    pub fn with_duration(duration: f64) -> Self {
        let mut player = Self::new();
        player.duration = Some(duration);
        player
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    fn position(&self) -> f64 {
        match self.anchor {
            Some(anchor) => self.offset_secs + anchor.elapsed().as_secs_f64(),
            None => self.offset_secs,
        }
    }

    /// Fire the callback if the play state changed since the last emit
    fn notify(&mut self) {
        let state = self.play_state();
        if self.last_notified == Some(state) {
            return;
        }
        self.last_notified = Some(state);
        if let Some(callback) = self.on_state_change.as_mut() {
            callback(state);
        }
    }
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerBackend for SimulatedPlayer {
    fn load(&mut self, media_kind: MediaKind, source_ref: &str, display_name: &str) {
        self.source = Some((media_kind, source_ref.to_string()));
        self.display_name = Some(display_name.to_string());
        self.anchor = None;
        self.offset_secs = 0.0;
        self.notify();
    }

    fn play(&mut self) {
        if self.source.is_some() && self.anchor.is_none() {
            self.anchor = Some(Instant::now());
        }
        self.notify();
    }

    fn pause(&mut self) {
        if let Some(anchor) = self.anchor.take() {
            self.offset_secs += anchor.elapsed().as_secs_f64();
        }
        self.notify();
    }

    fn seek_to(&mut self, seconds: f64) {
        if self.source.is_none() {
            return;
        }
        self.offset_secs = seconds.max(0.0);
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
        self.notify();
    }

    fn current_time(&self) -> f64 {
        match self.duration {
            Some(duration) => self.position().min(duration),
            None => self.position(),
        }
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn play_state(&self) -> PlayState {
        if let Some(duration) = self.duration {
            if self.source.is_some() && self.position() >= duration {
                return PlayState::Ended;
            }
        }
        if self.anchor.is_some() {
            PlayState::Playing
        } else {
            PlayState::Paused
        }
    }

    fn current_source(&self) -> Option<(MediaKind, &str)> {
        self.source
            .as_ref()
            .map(|(kind, source_ref)| (*kind, source_ref.as_str()))
    }

    fn set_on_state_change(&mut self, callback: StateCallback) {
        self.on_state_change = Some(callback);
    }

    fn poll(&mut self) {
        self.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_load_resets_position() {
        let mut player = SimulatedPlayer::new();
        player.load(MediaKind::File, "/media/a.mp3", "A");
        player.seek_to(42.0);
        assert_eq!(player.current_time(), 42.0);

        player.load(MediaKind::Stream, "abc123", "B");
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(player.play_state(), PlayState::Paused);
        assert_eq!(player.current_source(), Some((MediaKind::Stream, "abc123")));
    }

    #[test]
    fn test_pause_freezes_position() {
        let mut player = SimulatedPlayer::new();
        player.load(MediaKind::File, "/media/a.mp3", "A");
        player.seek_to(10.0);
        player.play();
        assert_eq!(player.play_state(), PlayState::Playing);

        player.pause();
        let frozen = player.current_time();
        assert!(frozen >= 10.0);
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(player.current_time(), frozen);
    }

    #[test]
    fn test_position_clamped_to_duration_and_ends() {
        let mut player = SimulatedPlayer::with_duration(5.0);
        player.load(MediaKind::File, "/media/a.mp3", "A");
        player.seek_to(100.0);
        assert_eq!(player.current_time(), 5.0);
        assert_eq!(player.play_state(), PlayState::Ended);
    }

    #[test]
    fn test_play_without_source_is_noop() {
        let mut player = SimulatedPlayer::new();
        player.play();
        assert_eq!(player.play_state(), PlayState::Paused);
        assert_eq!(player.current_time(), 0.0);
    }

    #[test]
    fn test_state_callback_fires_on_transitions() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut player = SimulatedPlayer::new();
        player.set_on_state_change(Box::new(move |state| sink.lock().unwrap().push(state)));

        player.load(MediaKind::File, "/media/a.mp3", "A");
        player.play();
        player.pause();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![PlayState::Paused, PlayState::Playing, PlayState::Paused]
        );
    }

    #[test]
    fn test_end_of_source_notified_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut player = SimulatedPlayer::with_duration(5.0);
        player.set_on_state_change(Box::new(move |state| sink.lock().unwrap().push(state)));
        player.load(MediaKind::File, "/media/a.mp3", "A");
        player.seek_to(100.0);
        player.poll();
        player.poll();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.iter().filter(|s| **s == PlayState::Ended).count(), 1);
    }

    #[test]
    fn test_seeking_back_rearms_end_notification() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut player = SimulatedPlayer::with_duration(5.0);
        player.set_on_state_change(Box::new(move |state| sink.lock().unwrap().push(state)));
        player.load(MediaKind::File, "/media/a.mp3", "A");
        player.seek_to(100.0);
        player.poll();
        player.seek_to(0.0);
        player.seek_to(100.0);
        player.poll();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.iter().filter(|s| **s == PlayState::Ended).count(), 2);
    }
}
