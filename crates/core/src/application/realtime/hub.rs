// Room registry (Hub)
//
// room -> members, guarded by one RwLock. Broadcast holds only the read lock
// and never awaits: every recipient gets a non-blocking push.

use super::connection::{ConnectionHandle, DeliveryError};
use crate::domain::{ConnectionId, HubStats, OutboundFrame, RoomId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

type Members = HashMap<ConnectionId, ConnectionHandle>;

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Default)]
pub struct Hub {
    rooms: RwLock<HashMap<RoomId, Members>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room, creating the room on first join.
    /// Joining twice is a no-op; returns true if the member is new.
    pub fn join(&self, room: &RoomId, connection: ConnectionHandle) -> bool {
        let mut rooms = self.write_rooms();
        let members = rooms.entry(room.clone()).or_default();
        let id = connection.id();
        let added = members.insert(id, connection).is_none();
        if added {
            debug!(room_id = %room, connection_id = %id, members = members.len(), "Joined room");
        }
        added
    }

    /// Remove a connection from a room; the room disappears with its last member
    pub fn leave(&self, room: &RoomId, connection: ConnectionId) {
        let mut rooms = self.write_rooms();
        Self::remove_member(&mut rooms, room, connection);
    }

    /// Remove a connection from every listed room in one pass
    pub fn leave_all(&self, rooms: &[RoomId], connection: ConnectionId) {
        if rooms.is_empty() {
            return;
        }
        let mut map = self.write_rooms();
        for room in rooms {
            Self::remove_member(&mut map, room, connection);
        }
    }

    /// Push a frame to every current member of `room`
    pub fn broadcast(&self, room: &RoomId, frame: &OutboundFrame) -> BroadcastReport {
        let rooms = self.read_rooms();
        let Some(members) = rooms.get(room) else {
            debug!(room_id = %room, "Broadcast to empty room");
            return BroadcastReport::default();
        };

        let mut report = BroadcastReport::default();
        for (id, member) in members {
            match member.try_deliver(frame) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Full) => {
                    report.dropped += 1;
                    warn!(room_id = %room, connection_id = %id, "Send buffer full, dropping frame");
                }
                Err(DeliveryError::Closed) => {
                    report.dropped += 1;
                    debug!(room_id = %room, connection_id = %id, "Skipping closed connection");
                }
            }
        }
        report
    }

    pub fn member_count(&self, room: &RoomId) -> usize {
        self.read_rooms().get(room).map_or(0, |m| m.len())
    }

    pub fn is_member(&self, room: &RoomId, connection: ConnectionId) -> bool {
        self.read_rooms()
            .get(room)
            .is_some_and(|m| m.contains_key(&connection))
    }

    pub fn stats(&self) -> HubStats {
        let rooms = self.read_rooms();
        HubStats {
            rooms: rooms.len(),
            memberships: rooms.values().map(|m| m.len()).sum(),
        }
    }

    fn remove_member(rooms: &mut HashMap<RoomId, Members>, room: &RoomId, connection: ConnectionId) {
        let Some(members) = rooms.get_mut(room) else {
            return;
        };
        if members.remove(&connection).is_some() {
            debug!(room_id = %room, connection_id = %connection, "Left room");
        }
        if members.is_empty() {
            rooms.remove(room);
        }
    }

    fn read_rooms(&self) -> RwLockReadGuard<'_, HashMap<RoomId, Members>> {
        self.rooms.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_rooms(&self) -> RwLockWriteGuard<'_, HashMap<RoomId, Members>> {
        self.rooms.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::realtime::Connection;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn frame(s: &str) -> OutboundFrame {
        OutboundFrame::from(s.to_string())
    }

    #[test]
    fn test_broadcast_reaches_room_members_only() {
        let hub = Hub::new();
        let (a, mut rx_a) = Connection::new(8);
        let (b, mut rx_b) = Connection::new(8);
        let (c, mut rx_c) = Connection::new(8);
        let room = RoomId::from(42);

        hub.join(&room, a.handle());
        hub.join(&room, b.handle());
        hub.join(&RoomId::from(7), c.handle());

        let report = hub.broadcast(&room, &frame("hi"));
        assert_eq!(report, BroadcastReport { delivered: 2, dropped: 0 });

        assert_eq!(rx_a.try_recv().unwrap().as_str(), "hi");
        assert_eq!(rx_b.try_recv().unwrap().as_str(), "hi");
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn test_double_join_delivers_once() {
        let hub = Hub::new();
        let (a, mut rx) = Connection::new(8);
        let room = RoomId::from(1);

        assert!(hub.join(&room, a.handle()));
        assert!(!hub.join(&room, a.handle()));
        assert_eq!(hub.member_count(&room), 1);

        hub.broadcast(&room, &frame("once"));
        assert_eq!(rx.try_recv().unwrap().as_str(), "once");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_leave_evicts_empty_room() {
        let hub = Hub::new();
        let (a, _rx_a) = Connection::new(8);
        let (b, _rx_b) = Connection::new(8);
        let room = RoomId::from("lobby");

        hub.join(&room, a.handle());
        hub.join(&room, b.handle());
        hub.leave(&room, a.id());
        assert_eq!(hub.stats(), HubStats { rooms: 1, memberships: 1 });
        assert!(!hub.is_member(&room, a.id()));

        hub.leave(&room, b.id());
        assert_eq!(hub.stats(), HubStats { rooms: 0, memberships: 0 });

        // leaving an unknown room is fine
        hub.leave(&RoomId::from(99), a.id());
    }

    #[test]
    fn test_leave_all_removes_every_membership() {
        let hub = Hub::new();
        let (a, _rx_a) = Connection::new(8);
        let (b, _rx_b) = Connection::new(8);
        let rooms = vec![RoomId::from(1), RoomId::from(2), RoomId::from(3)];

        for room in &rooms {
            hub.join(room, a.handle());
        }
        hub.join(&RoomId::from(2), b.handle());

        hub.leave_all(&rooms, a.id());
        assert_eq!(hub.stats(), HubStats { rooms: 1, memberships: 1 });
        assert!(hub.is_member(&RoomId::from(2), b.id()));
    }

    #[test]
    fn test_full_recipient_does_not_block_others() {
        let hub = Hub::new();
        let (slow, _rx_slow) = Connection::new(1);
        let (fast, mut rx_fast) = Connection::new(8);
        let room = RoomId::from(5);
        hub.join(&room, slow.handle());
        hub.join(&room, fast.handle());

        // fill the slow consumer's buffer
        hub.broadcast(&room, &frame("first"));

        let started = Instant::now();
        let report = hub.broadcast(&room, &frame("second"));
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });

        assert_eq!(rx_fast.try_recv().unwrap().as_str(), "first");
        assert_eq!(rx_fast.try_recv().unwrap().as_str(), "second");
    }

    #[test]
    fn test_closed_member_is_skipped() {
        let hub = Hub::new();
        let (gone, rx_gone) = Connection::new(8);
        let (live, mut rx_live) = Connection::new(8);
        let room = RoomId::from(5);
        hub.join(&room, gone.handle());
        hub.join(&room, live.handle());
        drop(rx_gone);

        let report = hub.broadcast(&room, &frame("x"));
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert_eq!(rx_live.try_recv().unwrap().as_str(), "x");
    }

    #[tokio::test]
    async fn test_concurrent_join_and_broadcast() {
        let hub = Arc::new(Hub::new());
        let room = RoomId::from(9);
        let mut receivers = Vec::new();
        let mut tasks = Vec::new();

        for _ in 0..16 {
            let (conn, rx) = Connection::new(64);
            receivers.push((conn, rx));
        }
        for (conn, _) in &receivers {
            let hub = Arc::clone(&hub);
            let room = room.clone();
            let handle = conn.handle();
            tasks.push(tokio::spawn(async move {
                hub.join(&room, handle);
                hub.broadcast(&room, &OutboundFrame::from("ping".to_string()));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(hub.member_count(&room), 16);
        // every connection saw at least its own broadcast
        for (_, rx) in &mut receivers {
            assert!(rx.try_recv().is_ok());
        }
    }
}
