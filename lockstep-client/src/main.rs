//! Lockstep client - main entry point
//!
//! Joins a room on a Lockstep server with the built-in simulated player
//! and follows the room until the connection drops or Ctrl+C.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lockstep_client::{Session, SessionConfig, SimulatedPlayer};

/// Command-line arguments for lockstep-client
#[derive(Parser, Debug)]
#[command(name = "lockstep-client")]
#[command(about = "Room-following playback client for Lockstep")]
#[command(version)]
struct Args {
    /// Server base URL
    #[arg(short, long, env = "LOCKSTEP_SERVER", default_value = "http://127.0.0.1:5750")]
    server: String,

    /// Room to join (created on first join)
    #[arg(short, long)]
    room: String,

    /// Display name shown to other members
    #[arg(short, long)]
    name: String,

    /// Heartbeat interval in milliseconds
    #[arg(long, env = "LOCKSTEP_HEARTBEAT_MS", default_value_t = 3000)]
    heartbeat_ms: u64,

    /// Pretend every track has this length in seconds, to exercise
    /// auto-advance with the simulated player
    #[arg(long)]
    track_duration: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lockstep_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let player = match args.track_duration {
        Some(duration) => SimulatedPlayer::with_duration(duration),
        None => SimulatedPlayer::new(),
    };

    let config = SessionConfig {
        base_url: args.server.trim_end_matches('/').to_string(),
        room_id: args.room,
        display_name: args.name,
        heartbeat_interval: Duration::from_millis(args.heartbeat_ms),
    };

    let session = Session::join(config, Box::new(player))
        .await
        .context("Failed to join room")?;
    info!("Member id: {}", session.member_id());

    // Ctrl+C is handled inside the event loop so the room leave still runs
    session.run().await.context("Session error")?;

    Ok(())
}
