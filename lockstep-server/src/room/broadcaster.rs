//! Per-room event broadcaster
//!
//! Distributes room events to SSE subscribers. Sends are fire-and-forget
//! and at-most-once; a send with no subscribers is not an error.

use lockstep_common::events::RoomEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast fan-out for one room's events
#[derive(Clone)]
pub struct RoomBroadcaster {
    tx: broadcast::Sender<RoomEvent>,
}

impl RoomBroadcaster {
    /// Create a broadcaster buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast an event, ignoring if no clients are connected
    pub fn send_lossy(&self, event: RoomEvent) {
        if let Ok(count) = self.tx.send(event) {
            debug!("broadcast event to {} subscribers", count);
        }
    }

    /// Broadcast a batch in order
    pub fn send_all(&self, events: Vec<RoomEvent>) {
        for event in events {
            self.send_lossy(event);
        }
    }

    /// Subscribe to all future events for this room
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.tx.subscribe()
    }

    /// Current number of connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
