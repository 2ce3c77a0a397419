//! HTTP API for the room synchronization service
//!
//! Client→server messages are POST commands; server→client messages are
//! Server-Sent Events on the per-room stream.

pub mod handlers;
pub mod sse;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::room::RoomRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Room registry
    pub registry: Arc<RoomRegistry>,
    /// Server port
    pub port: u16,
    /// Heartbeat interval advertised to clients, milliseconds
    pub heartbeat_interval_ms: u64,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no prefix for health endpoint)
        .route("/health", get(health_check))
        // Room directory
        .route("/api/rooms", get(handlers::room_directory))
        // Room-scoped commands and event stream
        .nest(
            "/api/rooms/:room_id",
            Router::new()
                .route("/join", post(handlers::join_room))
                .route("/leave", post(handlers::leave_room))
                .route("/transport", post(handlers::transport))
                .route("/play", post(handlers::play_now))
                .route("/queue/add", post(handlers::queue_add))
                .route("/queue/remove", post(handlers::queue_remove))
                .route("/queue/play", post(handlers::queue_play))
                .route("/queue/next", post(handlers::queue_next))
                .route("/queue/prev", post(handlers::queue_prev))
                .route("/track-ended", post(handlers::track_ended))
                .route("/heartbeat", post(handlers::heartbeat))
                .route("/events", get(sse::room_events)),
        )
        .with_state(state)
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "lockstep-server",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port,
        "heartbeat_interval_ms": state.heartbeat_interval_ms,
        "rooms": state.registry.room_count().await,
    }))
}
