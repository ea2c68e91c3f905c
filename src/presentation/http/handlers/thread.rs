//! Thread Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::{
    AddParticipantsRequest, ApiResponse, CreateThreadRequest, ThreadListQuery,
};
use crate::application::services::ThreadDto;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, validate_request};
use crate::startup::AppState;

/// `POST /threads`
pub async fn create_thread(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateThreadRequest>,
) -> Result<(StatusCode, ApiResponse<ThreadDto>), AppError> {
    validate_request(&body)?;

    let thread = state
        .chat
        .create_thread(auth.user_id, body.into_dto()?)
        .await?;

    Ok((StatusCode::CREATED, ApiResponse::success(thread)))
}

/// `GET /threads`
pub async fn list_threads(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ThreadListQuery>,
) -> Result<ApiResponse<Vec<ThreadDto>>, AppError> {
    let threads = state.chat.list_threads(auth.user_id, query.into()).await?;
    Ok(ApiResponse::success(threads))
}

/// `GET /threads/{thread_id}`
pub async fn get_thread(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(thread_id): Path<String>,
) -> Result<ApiResponse<ThreadDto>, AppError> {
    let thread_id = parse_id(&thread_id, "thread")?;
    let thread = state.chat.get_thread(thread_id, auth.user_id).await?;
    Ok(ApiResponse::success(thread))
}

/// `POST /threads/{thread_id}/participants`
pub async fn add_participants(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(thread_id): Path<String>,
    Json(body): Json<AddParticipantsRequest>,
) -> Result<ApiResponse<ThreadDto>, AppError> {
    let thread_id = parse_id(&thread_id, "thread")?;
    validate_request(&body)?;

    let thread = state
        .chat
        .add_participants(thread_id, auth.user_id, body.user_ids()?)
        .await?;

    Ok(ApiResponse::success(thread))
}

/// `DELETE /threads/{thread_id}/participants/@me`
pub async fn leave_thread(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(thread_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let thread_id = parse_id(&thread_id, "thread")?;
    state.chat.leave_thread(thread_id, auth.user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
