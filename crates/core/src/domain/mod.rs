// Domain Layer - Pure data types for queue and real-time delivery

pub mod envelope;
pub mod error;
pub mod job;
pub mod queue;
pub mod realtime;

// Re-exports
pub use envelope::{
    AuthPayload, CreateRoomPayload, Envelope, ErrorReason, JoinRoomPayload, OutboundFrame,
    RequestKind, SendMessagePayload, ServerEvent,
};
pub use error::DomainError;
pub use job::{JobPayload, Message, MessageId, MessageType};
pub use queue::{QueueConfig, QueueStats};
pub use realtime::{ConnectionId, HubStats, RoomId, UserId};
