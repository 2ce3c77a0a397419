//! Room registry
//!
//! Owns the set of live rooms keyed by room id. A room is created on first
//! join and destroyed when its membership empties; nothing survives a
//! process restart.
//!
//! Lock order is always registry map before room state. Command handlers
//! resolve the room under the map read lock, then serialize the mutation
//! through the room's mutex, so no two commands for the same room
//! interleave while unrelated rooms proceed in parallel.

use crate::error::{Error, Result};
use crate::room::broadcaster::RoomBroadcaster;
use crate::room::state::RoomState;
use lockstep_common::api::{RoomDirectoryEntry, RoomJoined};
use lockstep_common::events::RoomEvent;
use lockstep_common::time;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// One live room: serialized state plus its event fan-out
pub struct Room {
    pub state: Mutex<RoomState>,
    pub events: RoomBroadcaster,
}

/// Keyed store of live rooms
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    event_channel_capacity: usize,
}

impl RoomRegistry {
    pub fn new(event_channel_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            event_channel_capacity,
        }
    }

    /// Resolve a live room without creating it
    pub async fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Join a room, creating it on first reference
    ///
    /// The first joiner becomes host. Returns the full snapshot for the new
    /// member and broadcasts the membership change to everyone else.
    pub async fn join(&self, room_id: &str, display_name: String) -> RoomJoined {
        // The map lock is held across the member insert, like in leave: a
        // concurrent leave of the last member must not destroy the room
        // between resolving it and adding the new member
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                info!(room = room_id, "room created");
                Arc::new(Room {
                    state: Mutex::new(RoomState::new(room_id.to_string())),
                    events: RoomBroadcaster::new(self.event_channel_capacity),
                })
            })
            .clone();

        let mut state = room.state.lock().await;
        let member = state.add_member(display_name);
        info!(
            room = room_id,
            member = %member.display_name,
            host = member.is_host,
            "member joined"
        );

        let snapshot = state.join_snapshot(&member);
        room.events.send_lossy(RoomEvent::UserJoined {
            member,
            members: state.members.clone(),
            timestamp: time::now(),
        });
        snapshot
    }

    /// Remove a member, destroying the room when it empties
    ///
    /// When the host leaves with others remaining, host status transfers to
    /// the earliest-still-present joiner, who gets a targeted notification.
    pub async fn leave(&self, room_id: &str, member_id: Uuid) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| Error::RoomNotFound(room_id.to_string()))?;

        let mut state = room.state.lock().await;
        let departure = state
            .remove_member(member_id)
            .ok_or_else(|| Error::MemberNotFound(member_id.to_string()))?;

        if departure.room_empty {
            rooms.remove(room_id);
            info!(room = room_id, "room destroyed (empty)");
            return Ok(());
        }

        if let Some(promoted) = departure.promoted {
            info!(room = room_id, member = %promoted, "host failover");
            room.events.send_lossy(RoomEvent::PromotedToHost {
                target: promoted,
                timestamp: time::now(),
            });
        }

        room.events.send_lossy(RoomEvent::UserLeft {
            member_id: departure.member.id,
            display_name: departure.member.display_name,
            members: state.members.clone(),
            timestamp: time::now(),
        });
        debug!(room = room_id, "member left");
        Ok(())
    }

    /// Read-only room discovery listing
    pub async fn directory(&self) -> Vec<RoomDirectoryEntry> {
        let rooms = self.rooms.read().await;
        let mut entries = Vec::with_capacity(rooms.len());
        for (room_id, room) in rooms.iter() {
            let state = room.state.lock().await;
            entries.push(RoomDirectoryEntry {
                room_id: room_id.clone(),
                member_count: state.members.len(),
            });
        }
        entries.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        entries
    }

    /// Number of live rooms
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_room_created_on_first_join() {
        let registry = RoomRegistry::new(10);
        assert_eq!(registry.room_count().await, 0);

        let joined = registry.join("lobby", "Ada".to_string()).await;
        assert_eq!(registry.room_count().await, 1);
        assert!(joined.is_host);
        assert_eq!(joined.queue_index, -1);
        assert_eq!(joined.members.len(), 1);
    }

    #[tokio::test]
    async fn test_subsequent_joiners_are_guests() {
        let registry = RoomRegistry::new(10);
        registry.join("lobby", "Ada".to_string()).await;
        let second = registry.join("lobby", "Grace".to_string()).await;
        assert!(!second.is_host);
        assert_eq!(second.members.len(), 2);
        assert_eq!(registry.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_room_destroyed_when_empty() {
        let registry = RoomRegistry::new(10);
        let joined = registry.join("lobby", "Ada".to_string()).await;
        registry.leave("lobby", joined.member_id).await.unwrap();
        assert_eq!(registry.room_count().await, 0);
        assert!(registry.get("lobby").await.is_none());
    }

    #[tokio::test]
    async fn test_host_failover_notifies_promoted_member() {
        let registry = RoomRegistry::new(10);
        let m1 = registry.join("lobby", "Ada".to_string()).await;
        let m2 = registry.join("lobby", "Grace".to_string()).await;
        let _m3 = registry.join("lobby", "Edsger".to_string()).await;

        let room = registry.get("lobby").await.unwrap();
        let mut rx = room.events.subscribe();

        registry.leave("lobby", m1.member_id).await.unwrap();

        let promotion = rx.try_recv().unwrap();
        match promotion {
            RoomEvent::PromotedToHost { target, .. } => assert_eq!(target, m2.member_id),
            other => panic!("expected PromotedToHost, got {}", other.event_type()),
        }
        let left = rx.try_recv().unwrap();
        assert_eq!(left.event_type(), "UserLeft");
    }

    #[tokio::test]
    async fn test_leave_unknown_room() {
        let registry = RoomRegistry::new(10);
        let result = registry.leave("nowhere", Uuid::new_v4()).await;
        assert!(matches!(result, Err(Error::RoomNotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_join_leave_churn_never_orphans_joiner() {
        let registry = Arc::new(RoomRegistry::new(10));
        let churn = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                for _ in 0..500 {
                    let joined = registry.join("busy", "Churn".to_string()).await;
                    let _ = registry.leave("busy", joined.member_id).await;
                }
            })
        };

        for _ in 0..500 {
            let joined = registry.join("busy", "Ada".to_string()).await;
            // A member that just joined stays resolvable until they leave,
            // even while the other task empties and destroys the room
            let room = registry.get("busy").await.expect("room gone after join");
            assert!(room.state.lock().await.has_member(joined.member_id));
            registry.leave("busy", joined.member_id).await.unwrap();
        }
        churn.await.unwrap();
    }

    #[tokio::test]
    async fn test_rooms_are_independent() {
        let registry = RoomRegistry::new(10);
        let a = registry.join("alpha", "Ada".to_string()).await;
        registry.join("beta", "Grace".to_string()).await;

        registry.leave("alpha", a.member_id).await.unwrap();
        assert!(registry.get("alpha").await.is_none());
        assert!(registry.get("beta").await.is_some());
    }
}
