// Connection state
//
// One Connection per accepted link. The session owns it; the hub only ever
// sees a `ConnectionHandle` (id + sender clone).

use crate::domain::{ConnectionId, OutboundFrame, RoomId, UserId};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Why a frame could not be queued for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// Outbound buffer is full (slow consumer)
    Full,
    /// Writer has exited
    Closed,
}

/// Authentication state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Unauthenticated,
    Authenticated(UserId),
    Closed,
}

#[derive(Debug, Default)]
struct ConnectionState {
    user_id: Option<UserId>,
    rooms: HashSet<RoomId>,
    closed: bool,
}

/// Cheap, cloneable reference to a connection's outbound side
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::Sender<OutboundFrame>,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a frame without waiting
    pub fn try_deliver(&self, frame: &OutboundFrame) -> Result<(), DeliveryError> {
        self.sender.try_send(frame.clone()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

pub struct Connection {
    handle: ConnectionHandle,
    state: Mutex<ConnectionState>,
}

impl Connection {
    /// Create a connection and the receiving end its writer drains
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let connection = Self {
            handle: ConnectionHandle {
                id: ConnectionId::new(),
                sender,
            },
            state: Mutex::new(ConnectionState::default()),
        };
        (connection, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.lock_state().user_id
    }

    pub fn status(&self) -> ConnectionStatus {
        let state = self.lock_state();
        match (state.closed, state.user_id) {
            (true, _) => ConnectionStatus::Closed,
            (false, Some(user_id)) => ConnectionStatus::Authenticated(user_id),
            (false, None) => ConnectionStatus::Unauthenticated,
        }
    }

    /// Bind the connection to a verified user. A later AUTH replaces it.
    pub fn authenticate(&self, user_id: UserId) {
        self.lock_state().user_id = Some(user_id);
    }

    pub fn is_member(&self, room: &RoomId) -> bool {
        self.lock_state().rooms.contains(room)
    }

    /// Remember a joined room; false if it was already recorded
    pub fn record_room(&self, room: RoomId) -> bool {
        self.lock_state().rooms.insert(room)
    }

    pub fn rooms(&self) -> Vec<RoomId> {
        self.lock_state().rooms.iter().cloned().collect()
    }

    /// Mark the connection closed and hand back the rooms it must leave
    pub fn close(&self) -> Vec<RoomId> {
        let mut state = self.lock_state();
        state.closed = true;
        state.rooms.drain().collect()
    }

    /// Unicast a frame to this connection only
    pub fn send(&self, frame: &OutboundFrame) -> Result<(), DeliveryError> {
        self.handle.try_deliver(frame)
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(s: &str) -> OutboundFrame {
        OutboundFrame::from(s.to_string())
    }

    #[test]
    fn test_status_transitions() {
        let (conn, _rx) = Connection::new(4);
        assert_eq!(conn.status(), ConnectionStatus::Unauthenticated);

        conn.authenticate(7);
        assert_eq!(conn.status(), ConnectionStatus::Authenticated(7));
        assert_eq!(conn.user_id(), Some(7));

        conn.record_room(RoomId::from(1));
        let rooms = conn.close();
        assert_eq!(rooms, vec![RoomId::from(1)]);
        assert_eq!(conn.status(), ConnectionStatus::Closed);
        assert!(conn.rooms().is_empty());
    }

    #[test]
    fn test_record_room_is_idempotent() {
        let (conn, _rx) = Connection::new(4);
        assert!(conn.record_room(RoomId::from(42)));
        assert!(!conn.record_room(RoomId::from(42)));
        assert!(conn.is_member(&RoomId::from(42)));
        assert!(!conn.is_member(&RoomId::from(43)));
    }

    #[test]
    fn test_send_reports_full_and_closed() {
        let (conn, mut rx) = Connection::new(1);
        assert_eq!(conn.send(&frame("a")), Ok(()));
        assert_eq!(conn.send(&frame("b")), Err(DeliveryError::Full));

        assert_eq!(rx.try_recv().unwrap().as_str(), "a");
        drop(rx);
        assert_eq!(conn.send(&frame("c")), Err(DeliveryError::Closed));
    }
}
