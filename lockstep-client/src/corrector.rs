//! Drift correction against authoritative snapshots
//!
//! The server is the single source of truth for what plays and where the
//! playhead sits. Every snapshot the client receives, whether from a
//! heartbeat ack or an SSE broadcast, flows through [`DriftCorrector::apply`],
//! which nudges the local player only when it is measurably wrong.
//!
//! Each correction opens a short cooldown window. While it is open, further
//! drift corrections are skipped and outgoing transport commands are
//! suppressed, so a correction-induced player state change never echoes
//! back to the server as a user command.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use lockstep_common::api::HeartbeatAck;
use lockstep_common::events::RoomEvent;
use lockstep_common::model::MediaKind;

use crate::player::{PlayState, PlayerBackend};

/// Maximum tolerated gap in seconds between local and authoritative position
pub const DRIFT_TOLERANCE_SECS: f64 = 0.8;

/// Echo-suppression window opened after each correction
pub const CORRECTION_COOLDOWN: Duration = Duration::from_millis(500);

/// Authoritative playback snapshot, normalized from the two wire shapes
/// that carry one (heartbeat acks and SSE state events)
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub media_kind: Option<MediaKind>,
    pub source_ref: Option<String>,
    pub display_name: Option<String>,
    pub playing: bool,
    /// Elapsed seconds at `server_time`
    pub elapsed: f64,
    pub server_time: i64,
}

impl Snapshot {
    /// Extract a snapshot from state-carrying events; `None` for
    /// membership and queue events
    pub fn from_event(event: &RoomEvent) -> Option<Snapshot> {
        match event {
            RoomEvent::TrackChanged {
                state,
                elapsed,
                server_time,
                ..
            }
            | RoomEvent::SyncState {
                state,
                elapsed,
                server_time,
            } => Some(Snapshot {
                media_kind: state.media_kind,
                source_ref: state.source_ref.clone(),
                display_name: state.display_name.clone(),
                playing: state.playing,
                elapsed: *elapsed,
                server_time: *server_time,
            }),
            _ => None,
        }
    }
}

impl From<HeartbeatAck> for Snapshot {
    fn from(ack: HeartbeatAck) -> Self {
        Snapshot {
            media_kind: ack.media_kind,
            source_ref: ack.source_ref,
            display_name: ack.display_name,
            playing: ack.playing,
            elapsed: ack.elapsed,
            server_time: ack.server_time,
        }
    }
}

/// What a call to [`DriftCorrector::apply`] did to the player
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Player already agreed with the snapshot (or cooldown held it back)
    None,
    /// Only play/pause flipped
    PlayState,
    /// Position was re-seeked; carries the measured drift in seconds
    Drift(f64),
    /// A different source was loaded
    TrackChange,
}

/// Reconciles a [`PlayerBackend`] with authoritative snapshots
pub struct DriftCorrector {
    tolerance_secs: f64,
    cooldown: Duration,
    suppress_until: Option<Instant>,
}

impl DriftCorrector {
    pub fn new() -> Self {
        Self::with_limits(DRIFT_TOLERANCE_SECS, CORRECTION_COOLDOWN)
    }

    pub fn with_limits(tolerance_secs: f64, cooldown: Duration) -> Self {
        Self {
            tolerance_secs,
            cooldown,
            suppress_until: None,
        }
    }

    /// True while the echo-suppression window from the last correction is
    /// still open; callers must hold outgoing transport commands
    pub fn commands_suppressed(&self) -> bool {
        match self.suppress_until {
            Some(until) => Instant::now() < until,
            None => false,
        }
    }

    /// Reconcile the player against an authoritative snapshot
    ///
    /// Track changes always apply, cooldown or not; the window only guards
    /// against over-correcting the playhead on the same track.
    pub fn apply(&mut self, snapshot: &Snapshot, player: &mut dyn PlayerBackend) -> Correction {
        let Some(source_ref) = snapshot.source_ref.as_deref() else {
            // Nothing loaded server-side; silence the player if needed
            if player.play_state() == PlayState::Playing {
                player.pause();
                self.open_cooldown();
                return Correction::PlayState;
            }
            return Correction::None;
        };

        let same_source = matches!(
            player.current_source(),
            Some((_, current)) if current == source_ref
        );

        if !same_source {
            let media_kind = snapshot.media_kind.unwrap_or(MediaKind::File);
            let display_name = snapshot.display_name.as_deref().unwrap_or(source_ref);
            info!("Loading {} ({})", display_name, source_ref);
            player.load(media_kind, source_ref, display_name);
            player.seek_to(snapshot.elapsed);
            self.match_play_state(snapshot, player);
            self.open_cooldown();
            return Correction::TrackChange;
        }

        if self.commands_suppressed() {
            debug!("Snapshot skipped, correction cooldown open");
            return Correction::None;
        }

        let drift = (player.current_time() - snapshot.elapsed).abs();
        if drift > self.tolerance_secs {
            debug!("Drift {:.2}s exceeds tolerance, re-seeking", drift);
            player.seek_to(snapshot.elapsed);
            self.match_play_state(snapshot, player);
            self.open_cooldown();
            return Correction::Drift(drift);
        }

        let locally_playing = player.play_state() == PlayState::Playing;
        if locally_playing != snapshot.playing {
            self.match_play_state(snapshot, player);
            self.open_cooldown();
            return Correction::PlayState;
        }

        Correction::None
    }

    fn match_play_state(&self, snapshot: &Snapshot, player: &mut dyn PlayerBackend) {
        if snapshot.playing {
            player.play();
        } else {
            player.pause();
        }
    }

    fn open_cooldown(&mut self) {
        self.suppress_until = Some(Instant::now() + self.cooldown);
    }
}

impl Default for DriftCorrector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::SimulatedPlayer;

    fn paused_snapshot(source_ref: &str, elapsed: f64) -> Snapshot {
        Snapshot {
            media_kind: Some(MediaKind::File),
            source_ref: Some(source_ref.to_string()),
            display_name: Some("Track".to_string()),
            playing: false,
            elapsed,
            server_time: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_small_drift_left_alone() {
        let mut corrector = DriftCorrector::new();
        let mut player = SimulatedPlayer::new();
        player.load(MediaKind::File, "/media/a.mp3", "A");
        player.seek_to(10.0);

        let correction = corrector.apply(&paused_snapshot("/media/a.mp3", 10.5), &mut player);
        assert_eq!(correction, Correction::None);
        assert_eq!(player.current_time(), 10.0);
        assert!(!corrector.commands_suppressed());
    }

    #[test]
    fn test_large_drift_reseeks() {
        let mut corrector = DriftCorrector::new();
        let mut player = SimulatedPlayer::new();
        player.load(MediaKind::File, "/media/a.mp3", "A");
        player.seek_to(10.0);

        let correction = corrector.apply(&paused_snapshot("/media/a.mp3", 10.9), &mut player);
        match correction {
            Correction::Drift(drift) => assert!((drift - 0.9).abs() < 1e-9),
            other => panic!("expected drift correction, got {:?}", other),
        }
        assert_eq!(player.current_time(), 10.9);
        assert!(corrector.commands_suppressed());
    }

    #[test]
    fn test_cooldown_skips_followup_snapshot() {
        let mut corrector = DriftCorrector::new();
        let mut player = SimulatedPlayer::new();
        player.load(MediaKind::File, "/media/a.mp3", "A");
        player.seek_to(0.0);

        let first = corrector.apply(&paused_snapshot("/media/a.mp3", 5.0), &mut player);
        assert!(matches!(first, Correction::Drift(_)));

        // A second divergent snapshot inside the window is ignored
        let second = corrector.apply(&paused_snapshot("/media/a.mp3", 20.0), &mut player);
        assert_eq!(second, Correction::None);
        assert_eq!(player.current_time(), 5.0);
    }

    #[test]
    fn test_cooldown_expires() {
        let mut corrector = DriftCorrector::with_limits(DRIFT_TOLERANCE_SECS, Duration::ZERO);
        let mut player = SimulatedPlayer::new();
        player.load(MediaKind::File, "/media/a.mp3", "A");

        corrector.apply(&paused_snapshot("/media/a.mp3", 5.0), &mut player);
        assert!(!corrector.commands_suppressed());

        let next = corrector.apply(&paused_snapshot("/media/a.mp3", 20.0), &mut player);
        assert!(matches!(next, Correction::Drift(_)));
        assert_eq!(player.current_time(), 20.0);
    }

    #[test]
    fn test_track_change_reloads_even_during_cooldown() {
        let mut corrector = DriftCorrector::new();
        let mut player = SimulatedPlayer::new();
        player.load(MediaKind::File, "/media/a.mp3", "A");

        corrector.apply(&paused_snapshot("/media/a.mp3", 5.0), &mut player);
        assert!(corrector.commands_suppressed());

        let correction = corrector.apply(&paused_snapshot("/media/b.mp3", 1.5), &mut player);
        assert_eq!(correction, Correction::TrackChange);
        assert_eq!(player.current_source(), Some((MediaKind::File, "/media/b.mp3")));
        assert_eq!(player.current_time(), 1.5);
    }

    #[test]
    fn test_empty_snapshot_pauses_player() {
        let mut corrector = DriftCorrector::new();
        let mut player = SimulatedPlayer::new();
        player.load(MediaKind::File, "/media/a.mp3", "A");
        player.play();

        let empty = Snapshot {
            media_kind: None,
            source_ref: None,
            display_name: None,
            playing: false,
            elapsed: 0.0,
            server_time: 1_700_000_000_000,
        };
        let correction = corrector.apply(&empty, &mut player);
        assert_eq!(correction, Correction::PlayState);
        assert_eq!(player.play_state(), PlayState::Paused);
    }

    #[test]
    fn test_play_state_mismatch_corrected() {
        let mut corrector = DriftCorrector::new();
        let mut player = SimulatedPlayer::new();
        player.load(MediaKind::File, "/media/a.mp3", "A");

        let mut snapshot = paused_snapshot("/media/a.mp3", 0.0);
        snapshot.playing = true;
        let correction = corrector.apply(&snapshot, &mut player);
        assert_eq!(correction, Correction::PlayState);
        assert_eq!(player.play_state(), PlayState::Playing);
    }
}
