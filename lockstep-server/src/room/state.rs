//! Per-room mutable state
//!
//! Membership, queue, and playback state for a single room. The member list
//! is kept in join order so host failover is deterministic: the earliest
//! still-present joiner is always at the front.

use lockstep_common::api::{HeartbeatAck, RoomJoined};
use lockstep_common::events::RoomEvent;
use lockstep_common::model::{Member, PlaybackState, Track};
use lockstep_common::time;
use uuid::Uuid;

/// Result of removing a member from a room
#[derive(Debug, Clone)]
pub struct Departure {
    /// The member that left
    pub member: Member,
    /// Member promoted to host by the departure, if any
    pub promoted: Option<Uuid>,
    /// Whether the room is now empty and should be destroyed
    pub room_empty: bool,
}

/// Mutable state for one room
///
/// Exists from first join until membership empties; never persisted.
#[derive(Debug)]
pub struct RoomState {
    pub room_id: String,
    /// Members in join order; index 0 is the earliest still-present joiner
    pub members: Vec<Member>,
    /// Ordered track queue
    pub queue: Vec<Track>,
    /// Index of the selected track, -1 when nothing is selected
    pub queue_index: i64,
    /// Authoritative playback state
    pub playback: PlaybackState,
}

impl RoomState {
    pub fn new(room_id: String) -> Self {
        Self {
            room_id,
            members: Vec::new(),
            queue: Vec::new(),
            queue_index: -1,
            playback: PlaybackState::cleared(),
        }
    }

    /// Add a member; the first joiner becomes host
    pub fn add_member(&mut self, display_name: String) -> Member {
        let member = Member {
            id: Uuid::new_v4(),
            display_name,
            is_host: self.members.is_empty(),
        };
        self.members.push(member.clone());
        member
    }

    /// Remove a member, transferring host status to the earliest remaining
    /// joiner when the host leaves
    pub fn remove_member(&mut self, member_id: Uuid) -> Option<Departure> {
        let pos = self.members.iter().position(|m| m.id == member_id)?;
        let member = self.members.remove(pos);

        let mut promoted = None;
        if member.is_host {
            if let Some(first) = self.members.first_mut() {
                first.is_host = true;
                promoted = Some(first.id);
            }
        }

        Some(Departure {
            member,
            promoted,
            room_empty: self.members.is_empty(),
        })
    }

    pub fn has_member(&self, member_id: Uuid) -> bool {
        self.members.iter().any(|m| m.id == member_id)
    }

    /// Currently selected track, if any
    pub fn current_track(&self) -> Option<&Track> {
        if self.queue_index < 0 {
            return None;
        }
        self.queue.get(self.queue_index as usize)
    }

    /// Full snapshot for a member that just joined
    pub fn join_snapshot(&self, member: &Member) -> RoomJoined {
        let now_ms = time::now_ms();
        RoomJoined {
            room_id: self.room_id.clone(),
            member_id: member.id,
            is_host: member.is_host,
            members: self.members.clone(),
            state: self.playback.clone(),
            elapsed: self.playback.elapsed(now_ms),
            server_time: now_ms,
            queue: self.queue.clone(),
            queue_index: self.queue_index,
        }
    }

    /// Authoritative snapshot event after a transport change
    pub fn sync_state_event(&self, now_ms: i64) -> RoomEvent {
        RoomEvent::SyncState {
            state: self.playback.clone(),
            elapsed: self.playback.elapsed(now_ms),
            server_time: now_ms,
        }
    }

    /// Track selection event; elapsed is zero for a fresh start
    pub fn track_changed_event(&self, now_ms: i64) -> RoomEvent {
        RoomEvent::TrackChanged {
            state: self.playback.clone(),
            elapsed: self.playback.elapsed(now_ms),
            server_time: now_ms,
            queue_index: self.queue_index,
        }
    }

    /// Queue snapshot event
    pub fn queue_updated_event(&self) -> RoomEvent {
        RoomEvent::QueueUpdated {
            queue: self.queue.clone(),
            queue_index: self.queue_index,
        }
    }

    /// Heartbeat reply carrying the authoritative position
    pub fn heartbeat_ack(&self, now_ms: i64) -> HeartbeatAck {
        HeartbeatAck {
            media_kind: self.playback.media_kind,
            source_ref: self.playback.source_ref.clone(),
            display_name: self.playback.display_name.clone(),
            playing: self.playback.playing,
            elapsed: self.playback.elapsed(now_ms),
            server_time: now_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_joiner_is_host() {
        let mut room = RoomState::new("lobby".to_string());
        let m1 = room.add_member("Ada".to_string());
        let m2 = room.add_member("Grace".to_string());
        assert!(m1.is_host);
        assert!(!m2.is_host);
        assert_eq!(room.members.len(), 2);
    }

    #[test]
    fn test_guest_departure_keeps_host() {
        let mut room = RoomState::new("lobby".to_string());
        let _m1 = room.add_member("Ada".to_string());
        let m2 = room.add_member("Grace".to_string());

        let departure = room.remove_member(m2.id).unwrap();
        assert!(departure.promoted.is_none());
        assert!(!departure.room_empty);
        assert!(room.members[0].is_host);
    }

    #[test]
    fn test_last_departure_empties_room() {
        let mut room = RoomState::new("lobby".to_string());
        let m1 = room.add_member("Ada".to_string());
        let departure = room.remove_member(m1.id).unwrap();
        assert!(departure.room_empty);
        assert!(departure.promoted.is_none());
    }

    #[test]
    fn test_host_failover_promotes_earliest_remaining_joiner() {
        let mut room = RoomState::new("lobby".to_string());
        let m1 = room.add_member("Ada".to_string());
        let m2 = room.add_member("Grace".to_string());
        let m3 = room.add_member("Edsger".to_string());

        let departure = room.remove_member(m1.id).unwrap();
        // M2 joined before M3, so M2 is promoted, never M3
        assert_eq!(departure.promoted, Some(m2.id));
        assert!(room.members.iter().find(|m| m.id == m2.id).unwrap().is_host);
        assert!(!room.members.iter().find(|m| m.id == m3.id).unwrap().is_host);
    }

    #[test]
    fn test_exactly_one_host_after_any_departure() {
        let mut room = RoomState::new("lobby".to_string());
        let ids: Vec<_> = (0..5)
            .map(|i| room.add_member(format!("member-{i}")).id)
            .collect();

        for id in &ids[..4] {
            room.remove_member(*id).unwrap();
            let hosts = room.members.iter().filter(|m| m.is_host).count();
            assert_eq!(hosts, 1);
        }
    }

    #[test]
    fn test_remove_unknown_member() {
        let mut room = RoomState::new("lobby".to_string());
        room.add_member("Ada".to_string());
        assert!(room.remove_member(Uuid::new_v4()).is_none());
        assert_eq!(room.members.len(), 1);
    }
}
