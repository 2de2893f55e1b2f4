// Dispatch router
//
// Routes one inbound envelope to its handler. A failed request never changes
// state or reaches other connections; the sender alone gets an ERROR ack.

use super::connection::Connection;
use super::hub::Hub;
use crate::domain::{
    AuthPayload, CreateRoomPayload, Envelope, ErrorReason, JoinRoomPayload, OutboundFrame,
    RequestKind, RoomId, SendMessagePayload, ServerEvent, UserId,
};
use crate::port::{AuthError, ChatError, ChatService, CreateRoomRequest, SendMessageRequest, TokenVerifier};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
enum DispatchError {
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Rejected by chat service: {0}")]
    Rejected(#[from] ChatError),

    #[error("Failed to encode event: {0}")]
    Encode(serde_json::Error),
}

impl DispatchError {
    fn reason(&self) -> ErrorReason {
        match self {
            Self::Malformed(_) => ErrorReason::Malformed,
            Self::Unauthorized(_) => ErrorReason::Unauthorized,
            Self::Rejected(_) => ErrorReason::Rejected,
            Self::Encode(_) => ErrorReason::Internal,
        }
    }
}

type DispatchResult = Result<(), DispatchError>;

/// Envelope router shared by every connection
pub struct Dispatcher {
    hub: Arc<Hub>,
    tokens: Arc<dyn TokenVerifier>,
    chat: Arc<dyn ChatService>,
}

impl Dispatcher {
    pub fn new(hub: Arc<Hub>, tokens: Arc<dyn TokenVerifier>, chat: Arc<dyn ChatService>) -> Self {
        Self { hub, tokens, chat }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Decode and route one raw text frame
    pub async fn dispatch_text(&self, connection: &Connection, text: &str) {
        match Envelope::decode(text) {
            Ok(envelope) => self.dispatch(connection, envelope).await,
            Err(e) => {
                debug!(connection_id = %connection.id(), error = %e, "Malformed envelope");
                self.acknowledge_error(connection, None, ErrorReason::Malformed);
            }
        }
    }

    pub async fn dispatch(&self, connection: &Connection, envelope: Envelope) {
        let Some(kind) = envelope.request() else {
            debug!(
                connection_id = %connection.id(),
                kind = %envelope.kind,
                "Ignoring unknown envelope type"
            );
            return;
        };

        let payload = envelope.payload;
        let result = match kind {
            RequestKind::Auth => self.handle_auth(connection, payload),
            RequestKind::JoinRoom => self.handle_join_room(connection, payload),
            RequestKind::CreateRoom => self.handle_create_room(connection, payload).await,
            RequestKind::SendMessage => self.handle_send_message(connection, payload).await,
        };

        if let Err(e) = result {
            warn!(
                connection_id = %connection.id(),
                request = kind.as_str(),
                error = %e,
                "Request dropped"
            );
            self.acknowledge_error(connection, Some(kind), e.reason());
        }
    }

    fn handle_auth(&self, connection: &Connection, payload: serde_json::Value) -> DispatchResult {
        let auth: AuthPayload = decode(payload)?;
        let claims = self.tokens.verify_access_token(&auth.access_token)?;
        connection.authenticate(claims.user_id);
        info!(connection_id = %connection.id(), user_id = claims.user_id, "Connection authenticated");
        Ok(())
    }

    fn handle_join_room(&self, connection: &Connection, payload: serde_json::Value) -> DispatchResult {
        let join: JoinRoomPayload = decode(payload)?;
        self.join(connection, join.room_id);
        Ok(())
    }

    async fn handle_create_room(
        &self,
        connection: &Connection,
        payload: serde_json::Value,
    ) -> DispatchResult {
        let create: CreateRoomPayload = decode(payload)?;
        let owner_id = self.identify(connection, create.access_token.as_deref())?;

        let room_id = self
            .chat
            .create_room(CreateRoomRequest {
                name: create.name,
                owner_id,
                target_user_ids: create.target_user_ids,
            })
            .await?;
        info!(room_id = %room_id, owner_id, "Room created");

        self.join(connection, room_id.clone());

        let frame = encode(&ServerEvent::CreateRoom { room_id })?;
        if let Err(e) = connection.send(&frame) {
            warn!(connection_id = %connection.id(), error = ?e, "Failed to confirm room creation");
        }
        Ok(())
    }

    async fn handle_send_message(
        &self,
        connection: &Connection,
        payload: serde_json::Value,
    ) -> DispatchResult {
        let send: SendMessagePayload = decode(payload)?;
        let sender_id = self.identify(connection, send.access_token.as_deref())?;

        if !connection.is_member(&send.room_id) {
            self.join(connection, send.room_id.clone());
        }

        self.chat
            .send_message(SendMessageRequest {
                room_id: send.room_id.clone(),
                sender_id,
                text: send.message.clone(),
            })
            .await?;

        let frame = encode(&ServerEvent::SendMessage {
            room_id: send.room_id.clone(),
            message: send.message,
            sender_id,
        })?;
        let report = self.hub.broadcast(&send.room_id, &frame);
        debug!(
            room_id = %send.room_id,
            sender_id,
            delivered = report.delivered,
            dropped = report.dropped,
            "Message broadcast"
        );
        Ok(())
    }

    /// Resolve the acting user: the request's own token wins, else the AUTH'd identity
    fn identify(&self, connection: &Connection, token: Option<&str>) -> Result<UserId, AuthError> {
        match token {
            Some(token) => Ok(self.tokens.verify_access_token(token)?.user_id),
            None => connection.user_id().ok_or(AuthError::MissingToken),
        }
    }

    fn join(&self, connection: &Connection, room: RoomId) {
        self.hub.join(&room, connection.handle());
        connection.record_room(room);
    }

    fn acknowledge_error(&self, connection: &Connection, request: Option<RequestKind>, reason: ErrorReason) {
        let event = ServerEvent::Error {
            request: request.map(|kind| kind.as_str().to_string()),
            reason,
        };
        match event.to_frame() {
            Ok(frame) => {
                if let Err(e) = connection.send(&frame) {
                    debug!(connection_id = %connection.id(), error = ?e, "Error ack not delivered");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode error ack"),
        }
    }
}

fn decode<T: DeserializeOwned>(payload: serde_json::Value) -> Result<T, DispatchError> {
    Ok(serde_json::from_value(payload)?)
}

fn encode(event: &ServerEvent) -> Result<OutboundFrame, DispatchError> {
    event.to_frame().map_err(DispatchError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::chat_service::MockChatService;
    use crate::port::token_verifier::MockTokenVerifier;
    use crate::port::Claims;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    fn token_table() -> MockTokenVerifier {
        let mut tokens = MockTokenVerifier::new();
        tokens.expect_verify_access_token().returning(|token| match token {
            "tok-a" => Ok(Claims { user_id: 1 }),
            "tok-b" => Ok(Claims { user_id: 2 }),
            "expired" => Err(AuthError::Expired),
            _ => Err(AuthError::InvalidToken),
        });
        tokens
    }

    fn dispatcher(chat: MockChatService) -> Dispatcher {
        Dispatcher::new(Arc::new(Hub::new()), Arc::new(token_table()), Arc::new(chat))
    }

    fn next_json(rx: &mut mpsc::Receiver<OutboundFrame>) -> Option<Value> {
        rx.try_recv()
            .ok()
            .map(|frame| serde_json::from_str(frame.as_str()).unwrap())
    }

    #[tokio::test]
    async fn test_auth_sets_identity() {
        let d = dispatcher(MockChatService::new());
        let (conn, mut rx) = Connection::new(8);

        d.dispatch_text(&conn, r#"{"type":"AUTH","payload":{"accessToken":"tok-a"}}"#)
            .await;
        assert_eq!(conn.user_id(), Some(1));
        assert!(next_json(&mut rx).is_none());
    }

    #[tokio::test]
    async fn test_failed_auth_keeps_state_and_acks() {
        let d = dispatcher(MockChatService::new());
        let (conn, mut rx) = Connection::new(8);

        d.dispatch_text(&conn, r#"{"type":"AUTH","payload":{"accessToken":"expired"}}"#)
            .await;
        assert_eq!(conn.user_id(), None);
        assert_eq!(
            next_json(&mut rx),
            Some(json!({"type": "ERROR", "data": {"request": "AUTH", "reason": "unauthorized"}}))
        );
    }

    #[tokio::test]
    async fn test_malformed_frames_are_acked_without_request() {
        let d = dispatcher(MockChatService::new());
        let (conn, mut rx) = Connection::new(8);

        d.dispatch_text(&conn, "not json").await;
        assert_eq!(
            next_json(&mut rx),
            Some(json!({"type": "ERROR", "data": {"request": null, "reason": "malformed"}}))
        );

        d.dispatch_text(&conn, r#"{"type":"JOIN_ROOM","payload":{"roomId":""}}"#)
            .await;
        assert_eq!(
            next_json(&mut rx),
            Some(json!({"type": "ERROR", "data": {"request": "JOIN_ROOM", "reason": "malformed"}}))
        );
        assert_eq!(d.hub().stats().rooms, 0);
    }

    #[tokio::test]
    async fn test_unknown_type_is_silent() {
        let d = dispatcher(MockChatService::new());
        let (conn, mut rx) = Connection::new(8);

        d.dispatch_text(&conn, r#"{"type":"TYPING","payload":{"roomId":1}}"#)
            .await;
        assert!(next_json(&mut rx).is_none());
        assert!(conn.rooms().is_empty());
    }

    #[tokio::test]
    async fn test_join_room_records_membership() {
        let d = dispatcher(MockChatService::new());
        let (conn, _rx) = Connection::new(8);

        d.dispatch_text(&conn, r#"{"type":"JOIN_ROOM","payload":{"roomID":"42"}}"#)
            .await;
        assert!(conn.is_member(&RoomId::from(42)));
        assert!(d.hub().is_member(&RoomId::from(42), conn.id()));
    }

    #[tokio::test]
    async fn test_create_room_confirms_to_creator_only() {
        let mut chat = MockChatService::new();
        chat.expect_create_room()
            .withf(|req| req.name == "Room name" && req.owner_id == 1 && req.target_user_ids == vec![2, 3])
            .times(1)
            .returning(|_| Ok(RoomId::from(100)));
        let d = dispatcher(chat);

        let (creator, mut rx_creator) = Connection::new(8);
        let (bystander, mut rx_bystander) = Connection::new(8);
        d.hub().join(&RoomId::from(100), bystander.handle());

        d.dispatch(
            &creator,
            Envelope::decode(
                &json!({
                    "type": "CREATE_ROOM",
                    "payload": {"name": "Room name", "targetUserIDs": [2, 3], "accessToken": "tok-a"}
                })
                .to_string(),
            )
            .unwrap(),
        )
        .await;

        assert_eq!(
            next_json(&mut rx_creator),
            Some(json!({"type": "CREATE_ROOM", "data": {"chatGroupId": 100}}))
        );
        assert!(creator.is_member(&RoomId::from(100)));
        assert!(next_json(&mut rx_bystander).is_none());
    }

    #[tokio::test]
    async fn test_create_room_rejected_by_chat_service() {
        let mut chat = MockChatService::new();
        chat.expect_create_room()
            .returning(|_| Err(ChatError::Validation("name required".to_string())));
        let d = dispatcher(chat);
        let (conn, mut rx) = Connection::new(8);

        d.dispatch_text(
            &conn,
            r#"{"type":"CREATE_ROOM","payload":{"name":"","accessToken":"tok-a"}}"#,
        )
        .await;

        assert_eq!(
            next_json(&mut rx),
            Some(json!({"type": "ERROR", "data": {"request": "CREATE_ROOM", "reason": "rejected"}}))
        );
        assert!(conn.rooms().is_empty());
    }

    #[tokio::test]
    async fn test_send_message_broadcasts_to_room() {
        let mut chat = MockChatService::new();
        chat.expect_send_message()
            .withf(|req| req.room_id == RoomId::from(42) && req.sender_id == 1 && req.text == "hi")
            .times(1)
            .returning(|_| Ok(()));
        let d = dispatcher(chat);

        let (a, mut rx_a) = Connection::new(8);
        let (b, mut rx_b) = Connection::new(8);
        let (other, mut rx_other) = Connection::new(8);
        d.dispatch_text(&a, r#"{"type":"JOIN_ROOM","payload":{"roomId":42}}"#).await;
        d.dispatch_text(&b, r#"{"type":"JOIN_ROOM","payload":{"roomId":42}}"#).await;
        d.dispatch_text(&other, r#"{"type":"JOIN_ROOM","payload":{"roomId":43}}"#).await;

        d.dispatch_text(
            &a,
            r#"{"type":"SEND_MESSAGE","payload":{"roomId":42,"message":"hi","accessToken":"tok-a"}}"#,
        )
        .await;

        let expected = json!({"type": "SEND_MESSAGE", "data": {"chatGroupId": 42, "message_text": "hi", "userIdSender": 1}});
        assert_eq!(next_json(&mut rx_a), Some(expected.clone()));
        assert_eq!(next_json(&mut rx_b), Some(expected));
        assert!(next_json(&mut rx_other).is_none());
    }

    #[tokio::test]
    async fn test_send_message_auto_joins_and_uses_auth_identity() {
        let mut chat = MockChatService::new();
        chat.expect_send_message()
            .withf(|req| req.sender_id == 2)
            .times(1)
            .returning(|_| Ok(()));
        let d = dispatcher(chat);
        let (conn, mut rx) = Connection::new(8);

        d.dispatch_text(&conn, r#"{"type":"AUTH","payload":{"accessToken":"tok-b"}}"#)
            .await;
        d.dispatch_text(&conn, r#"{"type":"SEND_MESSAGE","payload":{"roomId":"lobby","message":"yo"}}"#)
            .await;

        assert!(conn.is_member(&RoomId::from("lobby")));
        let frame = next_json(&mut rx).unwrap();
        assert_eq!(frame["type"], "SEND_MESSAGE");
        assert_eq!(frame["data"]["userIdSender"], 2);
        assert_eq!(frame["data"]["chatGroupId"], "lobby");
    }

    #[tokio::test]
    async fn test_send_message_without_identity_is_unauthorized() {
        let mut chat = MockChatService::new();
        chat.expect_send_message().times(0);
        let d = dispatcher(chat);

        let (conn, mut rx) = Connection::new(8);
        let (member, mut rx_member) = Connection::new(8);
        d.hub().join(&RoomId::from(42), member.handle());

        d.dispatch_text(&conn, r#"{"type":"SEND_MESSAGE","payload":{"roomId":42,"message":"hi"}}"#)
            .await;
        d.dispatch_text(
            &conn,
            r#"{"type":"SEND_MESSAGE","payload":{"roomId":42,"message":"hi","accessToken":"bogus"}}"#,
        )
        .await;

        for _ in 0..2 {
            assert_eq!(
                next_json(&mut rx),
                Some(json!({"type": "ERROR", "data": {"request": "SEND_MESSAGE", "reason": "unauthorized"}}))
            );
        }
        assert!(next_json(&mut rx_member).is_none());
        assert!(!conn.is_member(&RoomId::from(42)));
    }
}
