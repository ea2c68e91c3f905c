//! Chat Session
//!
//! Protocol loop of one authenticated connection: access check, registry
//! membership, and the receive loop that turns client payloads into messages.

use std::sync::Arc;

use axum::extract::ws::Message;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use super::messages::ServerEvent;
use super::registry::{ConnectionHandle, ConnectionRegistry, OutboundFrame, Registration};
use crate::application::dto::SendMessageRequest;
use crate::application::services::{ChatError, ChatService, CreateMessageDto, MessageQueryDto};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::validation::validate_request;

/// Conversation a connection is opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationTarget {
    /// An existing thread the user participates in.
    Thread(i64),
    /// The direct thread with this user, created on demand.
    Direct { recipient_id: i64 },
}

/// Why the receive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Close frame or end of stream.
    ClientClosed,
    /// The transport reported an error.
    TransportError,
    /// An unexpected service failure; the connection should be closed.
    InternalError,
}

pub struct ChatSession {
    chat: Arc<dyn ChatService>,
    registry: Arc<ConnectionRegistry>,
    handle: ConnectionHandle,
    user_id: i64,
    registration: Registration,
}

impl ChatSession {
    /// Verify access to the conversation and register the connection.
    ///
    /// Nothing is registered when this fails.
    pub async fn open(
        chat: Arc<dyn ChatService>,
        registry: Arc<ConnectionRegistry>,
        user_id: i64,
        target: ConversationTarget,
        outbound: mpsc::UnboundedSender<OutboundFrame>,
    ) -> Result<Self, ChatError> {
        let thread_id = match target {
            ConversationTarget::Thread(thread_id) => {
                let probe = MessageQueryDto {
                    limit: Some(1),
                    before: None,
                };
                chat.list_messages(thread_id, user_id, probe).await?;
                thread_id
            }
            ConversationTarget::Direct { recipient_id } => {
                let thread = chat.get_or_create_direct_thread(user_id, recipient_id).await?;
                thread
                    .id
                    .parse::<i64>()
                    .map_err(|e| ChatError::Internal(format!("invalid thread id: {}", e)))?
            }
        };

        let handle = ConnectionHandle::new(outbound);
        let registration = registry.connect_scoped(thread_id, user_id, handle.clone());
        tracing::info!(
            thread_id,
            user_id,
            connection_id = %handle.connection_id(),
            "Chat session opened"
        );

        Ok(Self {
            chat,
            registry,
            handle,
            user_id,
            registration,
        })
    }

    pub fn thread_id(&self) -> i64 {
        self.registration.thread_id()
    }

    /// Process inbound frames in arrival order until the client leaves or an
    /// unexpected error occurs. The registry entry is released on return.
    pub async fn run<S>(self, mut inbound: S) -> SessionEnd
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        let end = loop {
            let frame = match inbound.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    tracing::debug!(thread_id = self.thread_id(), user_id = self.user_id, error = %e, "Transport error");
                    break SessionEnd::TransportError;
                }
                None => break SessionEnd::ClientClosed,
            };

            match frame {
                Message::Text(text) => {
                    if let Err(e) = self.handle_payload(text.as_str()).await {
                        tracing::error!(
                            thread_id = self.thread_id(),
                            user_id = self.user_id,
                            error = %e,
                            "Closing chat session after internal error"
                        );
                        break SessionEnd::InternalError;
                    }
                }
                Message::Close(_) => break SessionEnd::ClientClosed,
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
            }
        };

        tracing::info!(
            thread_id = self.thread_id(),
            user_id = self.user_id,
            connection_id = %self.registration.connection_id(),
            reason = ?end,
            "Chat session closed"
        );
        end
    }

    /// Handle one client payload. Only unexpected failures are returned;
    /// rejections are reported to this connection as error events.
    async fn handle_payload(&self, text: &str) -> Result<(), ChatError> {
        let request = match parse_payload(text) {
            Ok(request) => request,
            Err(message) => {
                self.handle.send_event(&ServerEvent::error(message));
                return Ok(());
            }
        };

        match self
            .chat
            .create_message(self.thread_id(), self.user_id, request)
            .await
        {
            Ok(message) => {
                metrics::record_message_created("websocket");
                self.registry
                    .broadcast(self.thread_id(), &ServerEvent::Message { data: message });
                Ok(())
            }
            Err(e) if e.is_domain() => {
                self.handle.send_event(&ServerEvent::error(e.to_string()));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Parse and validate a client payload, returning a client-facing message on
/// rejection.
fn parse_payload(text: &str) -> Result<CreateMessageDto, String> {
    let request: SendMessageRequest =
        serde_json::from_str(text).map_err(|_| "Invalid message payload".to_string())?;

    validate_request(&request)
        .and_then(|_| request.into_dto())
        .map_err(|e| match e {
            AppError::Validation(message) | AppError::BadRequest(message) => message,
            other => other.to_string(),
        })
}
