// Real-time Wire Envelopes
//
// Inbound:  {"type": "...", "payload": {...}}
// Outbound: {"type": "...", "data": {...}}

use super::realtime::{RoomId, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Inbound protocol unit. `payload` is decoded lazily by the matching handler.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Recognized request kind, `None` for types the router ignores
    pub fn request(&self) -> Option<RequestKind> {
        RequestKind::from_wire(&self.kind)
    }
}

/// The four request types the dispatch router understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Auth,
    JoinRoom,
    CreateRoom,
    SendMessage,
}

impl RequestKind {
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "AUTH" => Some(Self::Auth),
            "JOIN_ROOM" => Some(Self::JoinRoom),
            "CREATE_ROOM" => Some(Self::CreateRoom),
            "SEND_MESSAGE" => Some(Self::SendMessage),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "AUTH",
            Self::JoinRoom => "JOIN_ROOM",
            Self::CreateRoom => "CREATE_ROOM",
            Self::SendMessage => "SEND_MESSAGE",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinRoomPayload {
    #[serde(rename = "roomId", alias = "roomID", alias = "chatGroupId")]
    pub room_id: RoomId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomPayload {
    pub name: String,
    #[serde(rename = "targetUserIDs", alias = "targetUserIds", default)]
    pub target_user_ids: Vec<UserId>,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[serde(alias = "roomID", alias = "chatGroupId")]
    pub room_id: RoomId,
    pub message: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Why a request was dropped, reported back to the sender only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    Malformed,
    Unauthorized,
    Rejected,
    Internal,
}

/// Events the server pushes to connections
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    /// Unicast confirmation to the creator of a room
    CreateRoom {
        #[serde(rename = "chatGroupId")]
        room_id: RoomId,
    },

    /// Broadcast to every member of the room. Keys follow the chat clients'
    /// existing wire names.
    SendMessage {
        #[serde(rename = "chatGroupId")]
        room_id: RoomId,
        #[serde(rename = "message_text")]
        message: String,
        #[serde(rename = "userIdSender")]
        sender_id: UserId,
    },

    /// Unicast acknowledgment of a dropped request
    #[serde(rename_all = "camelCase")]
    Error {
        request: Option<String>,
        reason: ErrorReason,
    },
}

impl ServerEvent {
    pub fn to_frame(&self) -> Result<OutboundFrame, serde_json::Error> {
        Ok(OutboundFrame::from(serde_json::to_string(self)?))
    }
}

/// Encoded outbound text frame; cheap to clone across broadcast recipients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame(Arc<str>);

impl OutboundFrame {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OutboundFrame {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_envelope_without_payload() {
        let env = Envelope::decode(r#"{"type":"AUTH"}"#).unwrap();
        assert_eq!(env.request(), Some(RequestKind::Auth));
        assert!(env.payload.is_null());
    }

    #[test]
    fn test_unknown_type_is_not_a_request() {
        let env = Envelope::decode(r#"{"type":"PING","payload":{}}"#).unwrap();
        assert_eq!(env.request(), None);
    }

    #[test]
    fn test_join_room_accepts_legacy_field_names() {
        for payload in [json!({"roomId": 42}), json!({"roomID": 42}), json!({"chatGroupId": 42})] {
            let p: JoinRoomPayload = serde_json::from_value(payload).unwrap();
            assert_eq!(p.room_id, RoomId::from(42));
        }
    }

    #[test]
    fn test_create_room_payload_field_names() {
        let p: CreateRoomPayload = serde_json::from_value(json!({
            "name": "Room name",
            "targetUserIDs": [1, 2, 3],
            "accessToken": "tok"
        }))
        .unwrap();
        assert_eq!(p.target_user_ids, vec![1, 2, 3]);
        assert_eq!(p.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_server_event_wire_shape() {
        let event = ServerEvent::SendMessage {
            room_id: RoomId::from(42),
            message: "hi".to_string(),
            sender_id: 7,
        };
        let value: serde_json::Value =
            serde_json::from_str(event.to_frame().unwrap().as_str()).unwrap();
        assert_eq!(
            value,
            json!({"type": "SEND_MESSAGE", "data": {"chatGroupId": 42, "message_text": "hi", "userIdSender": 7}})
        );

        let ack = ServerEvent::Error {
            request: Some("AUTH".to_string()),
            reason: ErrorReason::Unauthorized,
        };
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(
            value,
            json!({"type": "ERROR", "data": {"request": "AUTH", "reason": "unauthorized"}})
        );
    }
}
