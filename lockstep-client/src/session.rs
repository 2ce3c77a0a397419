//! Server session
//!
//! Owns the HTTP client, the member identity, and the event loop that
//! keeps a [`PlayerBackend`] in lockstep with a room: SSE broadcasts for
//! prompt reaction, periodic heartbeats as the reconciliation backstop,
//! and end-of-track reports for auto-advance.

use std::time::Duration;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use lockstep_common::api::{
    EnqueueRequest, EnqueueResponse, HeartbeatAck, JoinRequest, MemberRequest, QueuePlayRequest,
    RoomJoined, StatusResponse, TrackEndedRequest, TransportAction, TransportRequest,
};
use lockstep_common::events::RoomEvent;
use lockstep_common::model::MediaKind;

use crate::corrector::{DriftCorrector, Snapshot};
use crate::error::{Error, Result};
use crate::player::{PlayState, PlayerBackend};

/// How often to let the player detect a finished track
const END_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Connection parameters for a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server base URL, e.g. `http://127.0.0.1:5750`
    pub base_url: String,
    pub room_id: String,
    pub display_name: String,
    /// Interval between heartbeat reconciliations
    pub heartbeat_interval: Duration,
}

/// A joined room membership driving one local player
pub struct Session {
    http: reqwest::Client,
    config: SessionConfig,
    member_id: Uuid,
    is_host: bool,
    corrector: DriftCorrector,
    player: Box<dyn PlayerBackend>,
    /// Queue position as of the last snapshot; -1 when nothing is selected
    queue_index: i64,
    /// Guards against re-reporting the same finished track
    reported_ended: bool,
}

impl Session {
    /// Join the room and seed the player from the join snapshot
    pub async fn join(config: SessionConfig, player: Box<dyn PlayerBackend>) -> Result<Session> {
        let http = reqwest::Client::new();
        let url = format!("{}/api/rooms/{}/join", config.base_url, config.room_id);
        let response = http
            .post(&url)
            .json(&JoinRequest {
                display_name: config.display_name.clone(),
            })
            .send()
            .await?;
        let joined: RoomJoined = decode_response(response).await?;

        info!(
            "Joined room {} as {} (host: {}, {} members)",
            joined.room_id,
            config.display_name,
            joined.is_host,
            joined.members.len()
        );

        let mut session = Session {
            http,
            config,
            member_id: joined.member_id,
            is_host: joined.is_host,
            corrector: DriftCorrector::new(),
            player,
            queue_index: joined.queue_index,
            reported_ended: false,
        };

        let snapshot = Snapshot {
            media_kind: joined.state.media_kind,
            source_ref: joined.state.source_ref.clone(),
            display_name: joined.state.display_name.clone(),
            playing: joined.state.playing,
            elapsed: joined.elapsed,
            server_time: joined.server_time,
        };
        session.apply_snapshot(&snapshot);
        Ok(session)
    }

    pub fn member_id(&self) -> Uuid {
        self.member_id
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    /// Run the event loop until the SSE stream closes or Ctrl+C, then leave
    pub async fn run(mut self) -> Result<()> {
        let (state_tx, mut state_rx) = mpsc::unbounded_channel();
        self.player.set_on_state_change(Box::new(move |state| {
            let _ = state_tx.send(state);
        }));

        let (tx, mut rx) = mpsc::channel::<RoomEvent>(64);
        let events_url = format!(
            "{}/api/rooms/{}/events?member_id={}",
            self.config.base_url, self.config.room_id, self.member_id
        );
        let reader = tokio::spawn(read_event_stream(self.http.clone(), events_url, tx));

        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut end_poll = tokio::time::interval(END_POLL_INTERVAL);
        end_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Received Ctrl+C, leaving room");
                    break;
                }
                _ = heartbeat.tick() => {
                    if let Err(err) = self.heartbeat().await {
                        warn!("Heartbeat failed: {}", err);
                    }
                }
                _ = end_poll.tick() => {
                    self.player.poll();
                }
                state = state_rx.recv() => {
                    if state == Some(PlayState::Ended) {
                        if let Err(err) = self.report_track_ended().await {
                            warn!("Failed to report track end: {}", err);
                        }
                    }
                }
                event = rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            info!("Event stream closed, leaving room");
                            break;
                        }
                    }
                }
            }
        }

        reader.abort();
        self.leave().await
    }

    /// Request play or pause; dropped while a correction cooldown is open
    pub async fn set_playing(&mut self, playing: bool) -> Result<()> {
        if self.corrector.commands_suppressed() {
            debug!("Transport command suppressed during correction cooldown");
            return Ok(());
        }
        let action = if playing {
            TransportAction::Play
        } else {
            TransportAction::Pause
        };
        self.transport(action, None).await
    }

    /// Request an absolute seek; dropped while a correction cooldown is open
    pub async fn seek(&mut self, offset_secs: f64) -> Result<()> {
        if self.corrector.commands_suppressed() {
            debug!("Seek command suppressed during correction cooldown");
            return Ok(());
        }
        self.transport(TransportAction::Seek, Some(offset_secs))
            .await
    }

    /// Append a track to the shared queue
    pub async fn enqueue(
        &self,
        media_kind: MediaKind,
        source_ref: &str,
        display_name: &str,
    ) -> Result<usize> {
        let response: EnqueueResponse = self
            .post("queue/add", &EnqueueRequest {
                member_id: self.member_id,
                media_kind,
                source_ref: source_ref.to_string(),
                display_name: display_name.to_string(),
            })
            .await?;
        Ok(response.index)
    }

    /// Jump the room to a queue position
    pub async fn play_index(&self, index: usize) -> Result<()> {
        let _: StatusResponse = self
            .post("queue/play", &QueuePlayRequest {
                member_id: self.member_id,
                index,
            })
            .await?;
        Ok(())
    }

    /// Skip to the next queue entry, wrapping at the end
    pub async fn next(&self) -> Result<()> {
        let _: StatusResponse = self.post("queue/next", &self.member_request()).await?;
        Ok(())
    }

    /// Skip to the previous queue entry, wrapping at the start
    pub async fn prev(&self) -> Result<()> {
        let _: StatusResponse = self.post("queue/prev", &self.member_request()).await?;
        Ok(())
    }

    /// Leave the room explicitly
    pub async fn leave(&self) -> Result<()> {
        let _: StatusResponse = self.post("leave", &self.member_request()).await?;
        Ok(())
    }

    async fn heartbeat(&mut self) -> Result<()> {
        let ack: HeartbeatAck = self.post("heartbeat", &self.member_request()).await?;
        let snapshot = Snapshot::from(ack);
        self.apply_snapshot(&snapshot);
        Ok(())
    }

    /// Feed an authoritative snapshot to the corrector
    ///
    /// A snapshot that shows playback running re-arms end-of-track
    /// reporting: after a natural end at the queue tail the server can
    /// resume the same track via transport-play with no track change, and
    /// that second end must be reported too.
    fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        if snapshot.playing {
            self.reported_ended = false;
        }
        self.corrector.apply(snapshot, self.player.as_mut());
    }

    async fn report_track_ended(&mut self) -> Result<()> {
        if self.reported_ended || self.queue_index < 0 {
            return Ok(());
        }
        self.reported_ended = true;
        let ended_index = self.queue_index;
        debug!("Track at index {} ended, reporting", ended_index);
        let _: StatusResponse = self
            .post("track-ended", &TrackEndedRequest {
                member_id: self.member_id,
                ended_index,
            })
            .await?;
        Ok(())
    }

    fn handle_event(&mut self, event: RoomEvent) {
        match &event {
            RoomEvent::UserJoined { member, members, .. } => {
                info!(
                    "{} joined ({} members)",
                    member.display_name,
                    members.len()
                );
            }
            RoomEvent::UserLeft {
                display_name,
                members,
                ..
            } => {
                info!("{} left ({} members)", display_name, members.len());
            }
            RoomEvent::PromotedToHost { .. } => {
                info!("Promoted to room host");
                self.is_host = true;
            }
            RoomEvent::TrackChanged { queue_index, .. } => {
                self.queue_index = *queue_index;
                self.reported_ended = false;
            }
            RoomEvent::QueueUpdated { queue_index, .. } => {
                self.queue_index = *queue_index;
            }
            RoomEvent::SyncState { .. } => {}
        }

        if let Some(snapshot) = Snapshot::from_event(&event) {
            self.apply_snapshot(&snapshot);
        }
    }

    async fn transport(&self, action: TransportAction, offset: Option<f64>) -> Result<()> {
        let _: StatusResponse = self
            .post("transport", &TransportRequest {
                member_id: self.member_id,
                action,
                offset,
            })
            .await?;
        Ok(())
    }

    fn member_request(&self) -> MemberRequest {
        MemberRequest {
            member_id: self.member_id,
        }
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!(
            "{}/api/rooms/{}/{}",
            self.config.base_url, self.config.room_id, path
        );
        let response = self.http.post(&url).json(body).send().await?;
        decode_response(response).await
    }
}

/// Decode a JSON response, mapping non-success statuses to [`Error::Server`]
async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let detail = match response.json::<StatusResponse>().await {
        Ok(body) => body.status,
        Err(_) => status.to_string(),
    };
    Err(Error::Server(detail))
}

/// Read the room's SSE stream, forwarding decoded events until it closes
async fn read_event_stream(http: reqwest::Client, url: String, tx: mpsc::Sender<RoomEvent>) {
    let response = match http.get(&url).send().await {
        Ok(response) => response,
        Err(err) => {
            warn!("Failed to open event stream: {}", err);
            return;
        }
    };

    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                warn!("Event stream error: {}", err);
                break;
            }
        };
        for frame in decoder.push(&String::from_utf8_lossy(&chunk)) {
            match serde_json::from_str::<RoomEvent>(&frame.data) {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                Err(err) => warn!("Ignoring malformed {} event: {}", frame.event, err),
            }
        }
    }
}

/// One decoded server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
struct SseFrame {
    event: String,
    data: String,
}

/// Incremental SSE frame decoder
///
/// Accumulates chunks and yields complete frames at blank-line boundaries.
/// Comment lines (keep-alives) and frames without data are dropped.
struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    fn push(&mut self, chunk: &str) -> Vec<SseFrame> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();
        while let Some(boundary) = self.buffer.find("\n\n") {
            let raw: String = self.buffer.drain(..boundary + 2).collect();
            if let Some(frame) = parse_frame(&raw) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut event = String::new();
    let mut data_lines: Vec<&str> = Vec::new();
    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event = rest.trim_start().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
        // Lines starting with ':' are comments (keep-alives); other fields
        // are not used by this protocol
    }
    if data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::SimulatedPlayer;

    fn test_session(player: SimulatedPlayer) -> Session {
        Session {
            http: reqwest::Client::new(),
            config: SessionConfig {
                base_url: "http://127.0.0.1:0".to_string(),
                room_id: "test".to_string(),
                display_name: "Tester".to_string(),
                heartbeat_interval: Duration::from_secs(3),
            },
            member_id: Uuid::new_v4(),
            is_host: false,
            corrector: DriftCorrector::new(),
            player: Box::new(player),
            queue_index: 0,
            reported_ended: false,
        }
    }

    fn snapshot(playing: bool, elapsed: f64) -> Snapshot {
        Snapshot {
            media_kind: Some(MediaKind::File),
            source_ref: Some("/media/a.mp3".to_string()),
            display_name: Some("A".to_string()),
            playing,
            elapsed,
            server_time: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_playing_snapshot_rearms_end_reporting() {
        let mut player = SimulatedPlayer::with_duration(5.0);
        player.load(MediaKind::File, "/media/a.mp3", "A");
        let mut session = test_session(player);
        session.reported_ended = true;

        // Same track resumed from the start via transport-play, no
        // TrackChanged fires
        session.apply_snapshot(&snapshot(true, 0.0));
        assert!(!session.reported_ended);
    }

    #[test]
    fn test_paused_snapshot_keeps_end_reported() {
        let mut player = SimulatedPlayer::with_duration(5.0);
        player.load(MediaKind::File, "/media/a.mp3", "A");
        let mut session = test_session(player);
        session.reported_ended = true;

        session.apply_snapshot(&snapshot(false, 5.0));
        assert!(session.reported_ended);
    }

    #[test]
    fn test_decoder_handles_split_frames() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push("event: SyncState\nda").is_empty());

        let frames = decoder.push("ta: {\"x\":1}\n\nevent: QueueUpdated\ndata: {}\n\n");
        assert_eq!(
            frames,
            vec![
                SseFrame {
                    event: "SyncState".to_string(),
                    data: "{\"x\":1}".to_string(),
                },
                SseFrame {
                    event: "QueueUpdated".to_string(),
                    data: "{}".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_decoder_drops_keepalive_comments() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(": keep-alive\n\n").is_empty());
    }

    #[test]
    fn test_multi_line_data_joined() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push("data: {\ndata: }\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\n}");
    }
}
