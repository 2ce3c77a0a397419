//! HTTP request handlers
//!
//! Every command resolves its room, takes the room lock for the whole
//! mutation, then broadcasts the resulting events. Commands against rooms
//! that no longer exist are rejected without side effects; the room may
//! have been torn down concurrently by the last member leaving.

use crate::api::AppState;
use crate::error::Error;
use crate::room::registry::Room;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use lockstep_common::api::{
    EnqueueRequest, EnqueueResponse, HeartbeatAck, JoinRequest, MemberRequest, QueuePlayRequest,
    QueueRemoveRequest, RoomDirectoryEntry, RoomJoined, StatusResponse, TrackEndedRequest,
    TransportRequest,
};
use lockstep_common::model::Track;
use lockstep_common::time;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

type ApiError = (StatusCode, Json<StatusResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(StatusResponse {
            status: message.into(),
        }),
    )
}

fn map_error(err: Error) -> ApiError {
    match &err {
        Error::RoomNotFound(_) | Error::MemberNotFound(_) => {
            api_error(StatusCode::NOT_FOUND, err.to_string())
        }
        Error::BadRequest(_) | Error::Queue(_) => {
            api_error(StatusCode::BAD_REQUEST, err.to_string())
        }
        _ => api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

async fn resolve_room(state: &AppState, room_id: &str) -> Result<Arc<Room>, ApiError> {
    state.registry.get(room_id).await.ok_or_else(|| {
        debug!(room = room_id, "command for unknown room ignored");
        api_error(StatusCode::NOT_FOUND, format!("no room {room_id}"))
    })
}

/// Check the sender is a member before mutating on their behalf
async fn require_member(room: &Room, member_id: Uuid, room_id: &str) -> Result<(), ApiError> {
    let state = room.state.lock().await;
    if state.has_member(member_id) {
        Ok(())
    } else {
        warn!(room = room_id, member = %member_id, "command from non-member ignored");
        Err(api_error(StatusCode::NOT_FOUND, "not a room member"))
    }
}

// ============================================================================
// Membership
// ============================================================================

/// POST /api/rooms/:room_id/join - create/attach member, reply with snapshot
pub async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<JoinRequest>,
) -> ApiResult<RoomJoined> {
    let display_name = req.display_name.trim();
    if display_name.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "display_name is required"));
    }

    let snapshot = state.registry.join(&room_id, display_name.to_string()).await;
    Ok(Json(snapshot))
}

/// POST /api/rooms/:room_id/leave
pub async fn leave_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<MemberRequest>,
) -> ApiResult<StatusResponse> {
    state
        .registry
        .leave(&room_id, req.member_id)
        .await
        .map_err(map_error)?;
    Ok(Json(StatusResponse {
        status: "left".to_string(),
    }))
}

/// GET /api/rooms - room discovery listing
pub async fn room_directory(State(state): State<AppState>) -> Json<Vec<RoomDirectoryEntry>> {
    Json(state.registry.directory().await)
}

// ============================================================================
// Transport
// ============================================================================

/// POST /api/rooms/:room_id/transport - play/pause/seek
pub async fn transport(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<TransportRequest>,
) -> ApiResult<StatusResponse> {
    let room = resolve_room(&state, &room_id).await?;
    require_member(&room, req.member_id, &room_id).await?;

    let mut room_state = room.state.lock().await;
    let event = room_state
        .apply_transport(req.action, req.offset, time::now_ms())
        .map_err(map_error)?;
    room.events.send_lossy(event);

    Ok(Json(StatusResponse {
        status: "applied".to_string(),
    }))
}

// ============================================================================
// Queue
// ============================================================================

fn track_from_request(req: &EnqueueRequest) -> Track {
    Track {
        id: Uuid::new_v4(),
        media_kind: req.media_kind,
        source_ref: req.source_ref.clone(),
        display_name: req.display_name.clone(),
        added_by: req.member_id,
    }
}

/// POST /api/rooms/:room_id/play - enqueue and play immediately
///
/// Covers both play-file and play-stream; the media kind is in the body.
pub async fn play_now(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<EnqueueRequest>,
) -> ApiResult<EnqueueResponse> {
    if req.source_ref.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "source_ref is required"));
    }
    let room = resolve_room(&state, &room_id).await?;
    require_member(&room, req.member_id, &room_id).await?;

    let mut room_state = room.state.lock().await;
    let now_ms = time::now_ms();
    room_state.queue.push(track_from_request(&req));
    let index = room_state.queue.len() - 1;
    let events = room_state.queue_play_at(index, now_ms).map_err(map_error)?;
    room.events.send_all(events);

    Ok(Json(EnqueueResponse { index }))
}

/// POST /api/rooms/:room_id/queue/add - append to the queue tail
pub async fn queue_add(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<EnqueueRequest>,
) -> ApiResult<EnqueueResponse> {
    if req.source_ref.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "source_ref is required"));
    }
    let room = resolve_room(&state, &room_id).await?;
    require_member(&room, req.member_id, &room_id).await?;

    let mut room_state = room.state.lock().await;
    let (index, events) = room_state.queue_append(track_from_request(&req), time::now_ms());
    room.events.send_all(events);

    Ok(Json(EnqueueResponse { index }))
}

/// POST /api/rooms/:room_id/queue/remove
pub async fn queue_remove(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<QueueRemoveRequest>,
) -> ApiResult<StatusResponse> {
    let room = resolve_room(&state, &room_id).await?;
    require_member(&room, req.member_id, &room_id).await?;

    let mut room_state = room.state.lock().await;
    let events = room_state
        .queue_remove(req.track_id, time::now_ms())
        .map_err(map_error)?;
    room.events.send_all(events);

    Ok(Json(StatusResponse {
        status: "removed".to_string(),
    }))
}

/// POST /api/rooms/:room_id/queue/play - select a queue index explicitly
pub async fn queue_play(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<QueuePlayRequest>,
) -> ApiResult<StatusResponse> {
    let room = resolve_room(&state, &room_id).await?;
    require_member(&room, req.member_id, &room_id).await?;

    let mut room_state = room.state.lock().await;
    let events = room_state
        .queue_play_at(req.index, time::now_ms())
        .map_err(map_error)?;
    room.events.send_all(events);

    Ok(Json(StatusResponse {
        status: "playing".to_string(),
    }))
}

/// POST /api/rooms/:room_id/queue/next - skip forward, wrapping at the tail
pub async fn queue_next(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<MemberRequest>,
) -> ApiResult<StatusResponse> {
    let room = resolve_room(&state, &room_id).await?;
    require_member(&room, req.member_id, &room_id).await?;

    let mut room_state = room.state.lock().await;
    let events = room_state.queue_next(time::now_ms()).map_err(map_error)?;
    room.events.send_all(events);

    Ok(Json(StatusResponse {
        status: "playing".to_string(),
    }))
}

/// POST /api/rooms/:room_id/queue/prev - skip backward, wrapping at the head
pub async fn queue_prev(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<MemberRequest>,
) -> ApiResult<StatusResponse> {
    let room = resolve_room(&state, &room_id).await?;
    require_member(&room, req.member_id, &room_id).await?;

    let mut room_state = room.state.lock().await;
    let events = room_state.queue_prev(time::now_ms()).map_err(map_error)?;
    room.events.send_all(events);

    Ok(Json(StatusResponse {
        status: "playing".to_string(),
    }))
}

/// POST /api/rooms/:room_id/track-ended - auto-advance trigger
///
/// Duplicate signals for the same index are absorbed by the engine's
/// idempotency guard; a discarded signal still returns 200.
pub async fn track_ended(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<TrackEndedRequest>,
) -> ApiResult<StatusResponse> {
    let room = resolve_room(&state, &room_id).await?;
    require_member(&room, req.member_id, &room_id).await?;

    let mut room_state = room.state.lock().await;
    let events = room_state.on_track_ended(req.ended_index, time::now_ms());
    let advanced = !events.is_empty();
    room.events.send_all(events);

    Ok(Json(StatusResponse {
        status: if advanced { "advanced" } else { "ignored" }.to_string(),
    }))
}

// ============================================================================
// Heartbeat
// ============================================================================

/// POST /api/rooms/:room_id/heartbeat - periodic reconciliation
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<MemberRequest>,
) -> ApiResult<HeartbeatAck> {
    let room = resolve_room(&state, &room_id).await?;
    require_member(&room, req.member_id, &room_id).await?;

    let room_state = room.state.lock().await;
    Ok(Json(room_state.heartbeat_ack(time::now_ms())))
}
