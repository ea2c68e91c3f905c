//! Direct Conversation Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::{
    ApiResponse, DirectConversationRequest, DirectMessageRequest, MessageListQuery,
    ThreadListQuery,
};
use crate::application::services::{DirectMessageDto, MessagesPageDto, ThreadDto};
use crate::infrastructure::metrics;
use crate::presentation::middleware::AuthUser;
use crate::presentation::websocket::ServerEvent;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, validate_request};
use crate::startup::AppState;

/// `POST /direct/conversations`
///
/// Returns the direct thread with the recipient, creating it on first use.
pub async fn open_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<DirectConversationRequest>,
) -> Result<ApiResponse<ThreadDto>, AppError> {
    let recipient_id = parse_id(&body.recipient_id, "recipient")?;
    let thread = state
        .chat
        .get_or_create_direct_thread(auth.user_id, recipient_id)
        .await?;
    Ok(ApiResponse::success(thread))
}

/// `GET /direct/conversations`
pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ThreadListQuery>,
) -> Result<ApiResponse<Vec<ThreadDto>>, AppError> {
    let threads = state
        .chat
        .list_direct_conversations(auth.user_id, query.into())
        .await?;
    Ok(ApiResponse::success(threads))
}

/// `GET /direct/conversations/{recipient_id}`
pub async fn get_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(recipient_id): Path<String>,
) -> Result<ApiResponse<ThreadDto>, AppError> {
    let recipient_id = parse_id(&recipient_id, "recipient")?;
    let thread = state
        .chat
        .get_direct_thread(auth.user_id, recipient_id)
        .await?;
    Ok(ApiResponse::success(thread))
}

/// `POST /direct/messages`
///
/// Responds with `{message, thread}` so the client learns the conversation id.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<DirectMessageRequest>,
) -> Result<(StatusCode, ApiResponse<DirectMessageDto>), AppError> {
    validate_request(&body)?;
    let (recipient_id, request) = body.into_parts()?;

    let sent = state
        .chat
        .send_direct_message(auth.user_id, recipient_id, request)
        .await?;

    metrics::record_message_created("http");
    let thread_id = parse_id(&sent.thread.id, "thread")
        .map_err(|_| AppError::Internal(format!("invalid thread id {}", sent.thread.id)))?;
    state.registry.broadcast(
        thread_id,
        &ServerEvent::Message {
            data: sent.message.clone(),
        },
    );

    Ok((StatusCode::CREATED, ApiResponse::success(sent)))
}

/// `GET /direct/messages/{recipient_id}`
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(recipient_id): Path<String>,
    Query(query): Query<MessageListQuery>,
) -> Result<ApiResponse<MessagesPageDto>, AppError> {
    let recipient_id = parse_id(&recipient_id, "recipient")?;
    let page = state
        .chat
        .list_direct_messages(auth.user_id, recipient_id, query.into_dto()?)
        .await?;
    Ok(ApiResponse::success(page))
}
