// In-memory chat usecase
//
// Keeps rooms and a bounded per-room history. Messages for a room id the
// service has never seen open that room implicitly (clients may address
// rooms created elsewhere). Rooms are never removed, so the room count is
// capped; past the cap new rooms are refused with `RoomLimit`.

use async_trait::async_trait;
use courier_core::domain::{RoomId, UserId};
use courier_core::port::{ChatError, ChatService, CreateRoomRequest, SendMessageRequest};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

const MAX_ROOM_NAME_LEN: usize = 100;
const MAX_MESSAGE_LEN: usize = 4096;
const DEFAULT_HISTORY_LIMIT: usize = 100;
const DEFAULT_MAX_ROOMS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub sender_id: UserId,
    pub text: String,
    /// epoch ms
    pub sent_at: i64,
}

#[derive(Debug, Default)]
struct Room {
    name: String,
    members: HashSet<UserId>,
    history: VecDeque<StoredMessage>,
}

pub struct InMemoryChatService {
    rooms: RwLock<HashMap<RoomId, Room>>,
    next_room_id: AtomicI64,
    history_limit: usize,
    max_rooms: usize,
}

impl InMemoryChatService {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            next_room_id: AtomicI64::new(1),
            history_limit: history_limit.max(1),
            max_rooms: DEFAULT_MAX_ROOMS,
        }
    }

    pub fn with_max_rooms(mut self, max_rooms: usize) -> Self {
        self.max_rooms = max_rooms.max(1);
        self
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Most recent messages of a room, oldest first
    pub fn history(&self, room: &RoomId) -> Vec<StoredMessage> {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        rooms
            .get(room)
            .map(|r| r.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_name(&self, room: &RoomId) -> Option<String> {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        rooms.get(room).map(|r| r.name.clone())
    }

    pub fn members(&self, room: &RoomId) -> Vec<UserId> {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        let mut members: Vec<UserId> = rooms
            .get(room)
            .map(|r| r.members.iter().copied().collect())
            .unwrap_or_default();
        members.sort_unstable();
        members
    }
}

impl Default for InMemoryChatService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatService for InMemoryChatService {
    async fn create_room(&self, request: CreateRoomRequest) -> Result<RoomId, ChatError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ChatError::Validation("room name must not be empty".to_string()));
        }
        if name.chars().count() > MAX_ROOM_NAME_LEN {
            return Err(ChatError::Validation(format!(
                "room name exceeds {} characters",
                MAX_ROOM_NAME_LEN
            )));
        }

        let mut members: HashSet<UserId> = request.target_user_ids.into_iter().collect();
        members.insert(request.owner_id);

        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        if rooms.len() >= self.max_rooms {
            return Err(ChatError::RoomLimit(self.max_rooms));
        }
        let room_id = RoomId::from(self.next_room_id.fetch_add(1, Ordering::Relaxed));
        rooms.insert(
            room_id.clone(),
            Room {
                name: name.to_string(),
                members,
                history: VecDeque::new(),
            },
        );
        drop(rooms);

        debug!(room_id = %room_id, owner_id = request.owner_id, "Room stored");
        Ok(room_id)
    }

    async fn send_message(&self, request: SendMessageRequest) -> Result<(), ChatError> {
        if request.text.trim().is_empty() {
            return Err(ChatError::Validation("message must not be empty".to_string()));
        }
        if request.text.len() > MAX_MESSAGE_LEN {
            return Err(ChatError::Validation(format!(
                "message exceeds {} bytes",
                MAX_MESSAGE_LEN
            )));
        }

        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        if !rooms.contains_key(&request.room_id) && rooms.len() >= self.max_rooms {
            return Err(ChatError::RoomLimit(self.max_rooms));
        }
        let room = rooms.entry(request.room_id.clone()).or_insert_with(|| Room {
            name: request.room_id.to_string(),
            ..Default::default()
        });
        room.members.insert(request.sender_id);
        room.history.push_back(StoredMessage {
            sender_id: request.sender_id,
            text: request.text,
            sent_at: chrono::Utc::now().timestamp_millis(),
        });
        while room.history.len() > self.history_limit {
            room.history.pop_front();
        }
        Ok(())
    }
}
