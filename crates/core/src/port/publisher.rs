// Message Publisher Port
// What business code sees of the task queue: fire-and-forget publishing

use crate::domain::{JobPayload, MessageId, MessageType};
use crate::error::QueueError;

/// Publish a message for asynchronous processing.
///
/// Never blocks. `QueueFull` and `NoHandlerRegistered` are returned so the
/// caller can decide to fall back to synchronous processing.
pub trait MessagePublisher: Send + Sync {
    fn publish(
        &self,
        message_type: &MessageType,
        payload: JobPayload,
    ) -> Result<MessageId, QueueError>;
}
