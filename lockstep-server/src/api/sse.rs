//! Per-room Server-Sent Events stream
//!
//! Streams room events to connected members. Targeted events (host
//! promotion) are filtered per subscriber so only the addressee sees them.
//! The stream carries a guard that detaches the member when the connection
//! drops, so a crashed client goes through the same leave/failover/destroy
//! path as an explicit leave.

use crate::api::AppState;
use crate::room::RoomRegistry;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use lockstep_common::api::StatusResponse;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub member_id: Uuid,
}

/// Removes the member when their event stream is dropped
///
/// If the member already left explicitly the leave is a no-op.
struct SubscriberGuard {
    registry: Arc<RoomRegistry>,
    room_id: String,
    member_id: Uuid,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        let registry = Arc::clone(&self.registry);
        let room_id = std::mem::take(&mut self.room_id);
        let member_id = self.member_id;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if registry.leave(&room_id, member_id).await.is_ok() {
                    debug!(
                        room = %room_id,
                        member = %member_id,
                        "member detached after stream disconnect"
                    );
                }
            });
        }
    }
}

/// GET /api/rooms/:room_id/events - SSE event stream for one member
pub async fn room_events(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<StatusResponse>)>
{
    let room = state.registry.get(&room_id).await.ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(StatusResponse {
                status: format!("no room {room_id}"),
            }),
        )
    })?;

    let member_id = query.member_id;
    debug!(room = %room_id, member = %member_id, "SSE subscriber connected");

    let guard = SubscriberGuard {
        registry: Arc::clone(&state.registry),
        room_id,
        member_id,
    };

    let rx = room.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        // The guard lives as long as the stream; dropping the connection
        // detaches the member
        let _connected = &guard;
        async move {
            match result {
                Ok(event) => {
                    // Targeted events go only to the addressee
                    if let Some(target) = event.target() {
                        if target != member_id {
                            return None;
                        }
                    }
                    match serde_json::to_string(&event) {
                        Ok(json) => Some(Ok(Event::default().event(event.event_type()).data(json))),
                        Err(e) => {
                            warn!("failed to serialize room event: {}", e);
                            None
                        }
                    }
                }
                Err(e) => {
                    // BroadcastStream error (lagged or closed); the heartbeat
                    // reconciles whatever this subscriber missed
                    warn!("SSE stream error: {:?}", e);
                    None
                }
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
