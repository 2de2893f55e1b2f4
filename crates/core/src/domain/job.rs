// Job & Message Domain Model

use super::error::{DomainError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Message ID (nanosecond clock based, see `ClockIdProvider`)
pub type MessageId = String;

/// Maximum length of a message type routing key
const MAX_MESSAGE_TYPE_LEN: usize = 128;

/// Routing key binding a message to exactly one registered job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageType(String);

impl MessageType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Validating constructor for message types coming from outside the process
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(DomainError::InvalidMessageType(
                "message type must not be empty".to_string(),
            ));
        }
        if s.len() > MAX_MESSAGE_TYPE_LEN {
            return Err(DomainError::InvalidMessageType(format!(
                "message type exceeds {} characters",
                MAX_MESSAGE_TYPE_LEN
            )));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Job payload, opaque to the queue.
///
/// Shared behind an `Arc` so a retried message and the handler task it is
/// lent to never copy the JSON tree.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPayload(Arc<serde_json::Value>);

impl JobPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(Arc::new(value))
    }

    /// Build a payload from any serializable value
    pub fn from_serializable<T: Serialize>(value: &T) -> std::result::Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::to_value(value)?))
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Decode the payload into the shape the consuming job expects
    pub fn decode<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        T::deserialize(self.0.as_ref())
    }
}

impl From<serde_json::Value> for JobPayload {
    fn from(value: serde_json::Value) -> Self {
        Self::new(value)
    }
}

/// One unit of queued work. Never persisted; lost if the process dies.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub message_type: MessageType,
    pub payload: JobPayload,
    /// Failed attempts so far (0 on first delivery)
    pub attempts: u32,
    /// epoch ms
    pub enqueued_at: i64,
}

impl Message {
    pub fn new(
        id: MessageId,
        message_type: MessageType,
        payload: JobPayload,
        enqueued_at: i64,
    ) -> Self {
        Self {
            id,
            message_type,
            payload,
            attempts: 0,
            enqueued_at,
        }
    }

    /// Create a message with fixed id/timestamp (for testing)
    pub fn new_test(message_type: &str, payload: serde_json::Value) -> Self {
        Self::new(
            "test-message".to_string(),
            MessageType::new(message_type),
            JobPayload::new(payload),
            0,
        )
    }
}
