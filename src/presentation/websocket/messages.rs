//! WebSocket Message Types
//!
//! Outbound event shapes and close codes. Inbound payloads are
//! [`SendMessageRequest`](crate::application::dto::SendMessageRequest) bodies.

use axum::extract::ws::Utf8Bytes;
use serde::Serialize;

use crate::application::dto::{MessageDeletedResponse, MessagesDeletedResponse};
use crate::application::services::MessageDto;

/// Missing, invalid, expired or revoked credential.
pub const CLOSE_POLICY_VIOLATION: u16 = 4401;
/// The caller may not access the requested conversation.
pub const CLOSE_ACCESS_REFUSED: u16 = 4403;
/// Unexpected server failure.
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Event pushed to connected clients.
///
/// Serialized as `{"event": "<name>", ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    Message { data: MessageDto },
    MessageEdited { data: MessageDto },
    MessageDeleted { data: MessageDeletedResponse },
    MessagesDeleted { data: MessagesDeletedResponse },
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Message { .. } => "message",
            ServerEvent::MessageEdited { .. } => "message_edited",
            ServerEvent::MessageDeleted { .. } => "message_deleted",
            ServerEvent::MessagesDeleted { .. } => "messages_deleted",
            ServerEvent::Error { .. } => "error",
        }
    }

    pub fn to_text(&self) -> Result<Utf8Bytes, serde_json::Error> {
        serde_json::to_string(self).map(Utf8Bytes::from)
    }
}
