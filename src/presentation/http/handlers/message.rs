//! Message Handlers
//!
//! Every successful write is broadcast to the thread's live connections.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::{
    ApiResponse, EditMessageRequest, MessageDeletedResponse, MessageListQuery,
    MessagesDeletedResponse, SendMessageRequest,
};
use crate::application::services::{MessageDto, MessagesPageDto};
use crate::infrastructure::metrics;
use crate::presentation::middleware::AuthUser;
use crate::presentation::websocket::ServerEvent;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, validate_request};
use crate::startup::AppState;

/// `GET /threads/{thread_id}/messages`
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(thread_id): Path<String>,
    Query(query): Query<MessageListQuery>,
) -> Result<ApiResponse<MessagesPageDto>, AppError> {
    let thread_id = parse_id(&thread_id, "thread")?;
    let page = state
        .chat
        .list_messages(thread_id, auth.user_id, query.into_dto()?)
        .await?;
    Ok(ApiResponse::success(page))
}

/// `POST /threads/{thread_id}/messages`
pub async fn create_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(thread_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, ApiResponse<MessageDto>), AppError> {
    let thread_id = parse_id(&thread_id, "thread")?;
    validate_request(&body)?;

    let message = state
        .chat
        .create_message(thread_id, auth.user_id, body.into_dto()?)
        .await?;

    metrics::record_message_created("http");
    state.registry.broadcast(
        thread_id,
        &ServerEvent::Message {
            data: message.clone(),
        },
    );

    Ok((StatusCode::CREATED, ApiResponse::success(message)))
}

/// `PATCH /threads/{thread_id}/messages/{message_id}`
pub async fn edit_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((thread_id, message_id)): Path<(String, String)>,
    Json(body): Json<EditMessageRequest>,
) -> Result<ApiResponse<MessageDto>, AppError> {
    let thread_id = parse_id(&thread_id, "thread")?;
    let message_id = parse_id(&message_id, "message")?;
    validate_request(&body)?;

    let message = state
        .chat
        .edit_message(thread_id, message_id, auth.user_id, body.content)
        .await?;

    state.registry.broadcast(
        thread_id,
        &ServerEvent::MessageEdited {
            data: message.clone(),
        },
    );

    Ok(ApiResponse::success(message))
}

/// `DELETE /threads/{thread_id}/messages/{message_id}`
pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((thread_id, message_id)): Path<(String, String)>,
) -> Result<ApiResponse<MessageDeletedResponse>, AppError> {
    let thread_id = parse_id(&thread_id, "thread")?;
    let message_id = parse_id(&message_id, "message")?;

    state
        .chat
        .soft_delete_message(thread_id, message_id, auth.user_id)
        .await?;

    let deleted = MessageDeletedResponse {
        id: message_id.to_string(),
        thread_id: thread_id.to_string(),
    };
    state.registry.broadcast(
        thread_id,
        &ServerEvent::MessageDeleted {
            data: deleted.clone(),
        },
    );

    Ok(ApiResponse::success(deleted))
}

/// `DELETE /threads/{thread_id}/messages`
pub async fn delete_all_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(thread_id): Path<String>,
) -> Result<ApiResponse<MessagesDeletedResponse>, AppError> {
    let thread_id = parse_id(&thread_id, "thread")?;

    let count = state
        .chat
        .soft_delete_all_messages(thread_id, auth.user_id)
        .await?;

    let deleted = MessagesDeletedResponse { deleted: count };
    state.registry.broadcast(
        thread_id,
        &ServerEvent::MessagesDeleted {
            data: deleted.clone(),
        },
    );

    Ok(ApiResponse::success(deleted))
}
