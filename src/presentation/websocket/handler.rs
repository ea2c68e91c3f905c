//! WebSocket Connection Handler
//!
//! Upgrade endpoints for thread and direct-conversation connections. Each
//! connection gets one writer task fed by an unbounded channel; the registry
//! holds the sending side.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use super::messages::{ServerEvent, CLOSE_ACCESS_REFUSED, CLOSE_INTERNAL_ERROR, CLOSE_POLICY_VIOLATION};
use super::registry::OutboundFrame;
use super::session::{ChatSession, ConversationTarget, SessionEnd};
use crate::application::services::IdentityResolver;
use crate::presentation::middleware::bearer_token;
use crate::shared::error::AppError;
use crate::shared::validation::parse_id;
use crate::startup::AppState;

/// Query string accepted on upgrade requests
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// `GET /ws/chat/{thread_id}`
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    Path(thread_id): Path<String>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let target = ConversationTarget::Thread(parse_id(&thread_id, "thread")?);
    let credential = select_credential(header_token(&headers), query.token.as_deref());
    Ok(upgrade(ws, state, credential, target))
}

/// `GET /ws/direct/{recipient_id}`
pub async fn direct_ws_handler(
    ws: WebSocketUpgrade,
    Path(recipient_id): Path<String>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let target = ConversationTarget::Direct {
        recipient_id: parse_id(&recipient_id, "recipient")?,
    };
    let credential = select_credential(header_token(&headers), query.token.as_deref());
    Ok(upgrade(ws, state, credential, target))
}

fn upgrade(
    ws: WebSocketUpgrade,
    state: AppState,
    credential: Option<String>,
    target: ConversationTarget,
) -> Response {
    let websocket = &state.settings.websocket;
    ws.max_message_size(websocket.max_message_size)
        .max_frame_size(websocket.max_frame_size)
        .on_upgrade(move |socket| serve_socket(socket, state, credential, target))
}

/// Bearer token of the `Authorization` header. Other schemes count as absent
/// so the query parameter can still supply the credential.
fn header_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
}

/// Pick the credential from the `Authorization` header, falling back to the
/// `token` query parameter. Blank values count as absent.
pub fn select_credential(header: Option<&str>, query: Option<&str>) -> Option<String> {
    header
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| query.map(str::trim).filter(|t| !t.is_empty()))
        .map(str::to_string)
}

async fn authenticate(
    identity: &dyn IdentityResolver,
    credential: Option<String>,
) -> Result<i64, String> {
    let credential = credential.ok_or_else(|| "Missing token".to_string())?;
    identity.resolve(&credential).await.map_err(|e| e.to_string())
}

fn close(outbound: &mpsc::UnboundedSender<OutboundFrame>, code: u16, reason: impl Into<String>) {
    let _ = outbound.send(OutboundFrame::Close {
        code,
        reason: reason.into(),
    });
}

async fn serve_socket(
    socket: WebSocket,
    state: AppState,
    credential: Option<String>,
    target: ConversationTarget,
) {
    let (sink, stream) = socket.split();
    let (outbound, frames) = mpsc::unbounded_channel::<OutboundFrame>();
    let writer = tokio::spawn(write_frames(sink, frames));

    match authenticate(state.identity.as_ref(), credential).await {
        Ok(user_id) => {
            let opened = ChatSession::open(
                state.chat.clone(),
                state.registry.clone(),
                user_id,
                target,
                outbound.clone(),
            )
            .await;

            match opened {
                Ok(session) => {
                    if session.run(stream).await == SessionEnd::InternalError {
                        close(&outbound, CLOSE_INTERNAL_ERROR, "Internal server error");
                    }
                }
                Err(e) if e.is_domain() => {
                    tracing::debug!(user_id, ?target, error = %e, "Conversation access refused");
                    if let Ok(text) = ServerEvent::error(e.to_string()).to_text() {
                        let _ = outbound.send(OutboundFrame::Event(text));
                    }
                    close(&outbound, CLOSE_ACCESS_REFUSED, e.to_string());
                }
                Err(e) => {
                    tracing::error!(user_id, ?target, error = %e, "Failed to open chat session");
                    close(&outbound, CLOSE_INTERNAL_ERROR, "Internal server error");
                }
            }
        }
        Err(reason) => {
            tracing::debug!(?target, reason = %reason, "WebSocket authentication failed");
            close(&outbound, CLOSE_POLICY_VIOLATION, reason);
        }
    }

    drop(outbound);
    if let Err(e) = writer.await {
        tracing::error!(error = %e, "WebSocket writer task failed");
    }
}

/// Forward queued frames to the socket until the channel closes, a close
/// frame is written, or the socket fails.
async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut frames: mpsc::UnboundedReceiver<OutboundFrame>,
) {
    while let Some(frame) = frames.recv().await {
        let result = match frame {
            OutboundFrame::Event(text) => sink.send(Message::Text(text)).await,
            OutboundFrame::Close { code, reason } => {
                let frame = CloseFrame {
                    code,
                    reason: reason.into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                break;
            }
        };

        if result.is_err() {
            break;
        }
    }

    let _ = sink.close().await;
}
