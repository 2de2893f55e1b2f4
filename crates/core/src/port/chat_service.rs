// Chat Usecase Port
// Room and message persistence is owned by the chat usecase, not by the hub

use crate::domain::{RoomId, UserId};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoomRequest {
    pub name: String,
    pub owner_id: UserId,
    pub target_user_ids: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub text: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Room limit reached ({0} rooms)")]
    RoomLimit(usize),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Create a room and return its id
    async fn create_room(&self, request: CreateRoomRequest) -> Result<RoomId, ChatError>;

    /// Persist a message; broadcasting is the caller's job
    async fn send_message(&self, request: SendMessageRequest) -> Result<(), ChatError>;
}
