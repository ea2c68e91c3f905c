//! Request DTOs
//!
//! Data structures for API request bodies and query strings. Ids arrive as
//! strings and are parsed into service DTOs here.

use serde::Deserialize;
use validator::Validate;

use crate::application::services::{
    CreateMessageDto, CreateThreadDto, MessageQueryDto, ThreadQueryDto,
};
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, parse_ids};

/// Create thread request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateThreadRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,

    #[serde(default)]
    #[validate(length(max = 100, message = "At most 100 participants are allowed"))]
    pub participant_ids: Vec<String>,

    #[serde(default)]
    pub is_direct: bool,
}

impl CreateThreadRequest {
    pub fn into_dto(self) -> Result<CreateThreadDto, AppError> {
        Ok(CreateThreadDto {
            participant_ids: parse_ids(&self.participant_ids, "participant")?,
            title: self.title,
            is_direct: self.is_direct,
        })
    }
}

/// Add participants request
#[derive(Debug, Deserialize, Validate)]
pub struct AddParticipantsRequest {
    #[validate(length(min = 1, max = 100, message = "Provide 1-100 user ids"))]
    pub user_ids: Vec<String>,
}

impl AddParticipantsRequest {
    pub fn user_ids(&self) -> Result<Vec<i64>, AppError> {
        parse_ids(&self.user_ids, "user")
    }
}

/// Send message request
///
/// Also the payload clients send over the WebSocket connection.
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 4000, message = "Content must be 1-4000 characters"))]
    pub content: String,

    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 attachments are allowed"))]
    pub attachment_ids: Vec<String>,
}

impl SendMessageRequest {
    pub fn into_dto(self) -> Result<CreateMessageDto, AppError> {
        Ok(CreateMessageDto {
            attachment_ids: parse_ids(&self.attachment_ids, "attachment")?,
            content: self.content,
        })
    }
}

/// Edit message request
#[derive(Debug, Deserialize, Validate)]
pub struct EditMessageRequest {
    #[validate(length(min = 1, max = 4000, message = "Content must be 1-4000 characters"))]
    pub content: String,
}

/// Open (or fetch) a direct conversation
#[derive(Debug, Deserialize)]
pub struct DirectConversationRequest {
    pub recipient_id: String,
}

/// Send a direct message
#[derive(Debug, Deserialize, Validate)]
pub struct DirectMessageRequest {
    pub recipient_id: String,

    #[validate(length(min = 1, max = 4000, message = "Content must be 1-4000 characters"))]
    pub content: String,

    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 attachments are allowed"))]
    pub attachment_ids: Vec<String>,
}

impl DirectMessageRequest {
    /// Split into the recipient id and the message to post.
    pub fn into_parts(self) -> Result<(i64, CreateMessageDto), AppError> {
        let recipient_id = parse_id(&self.recipient_id, "recipient")?;
        let message = CreateMessageDto {
            attachment_ids: parse_ids(&self.attachment_ids, "attachment")?,
            content: self.content,
        };
        Ok((recipient_id, message))
    }
}

/// Thread listing query string
#[derive(Debug, Default, Deserialize)]
pub struct ThreadListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub include_direct: bool,
}

impl From<ThreadListQuery> for ThreadQueryDto {
    fn from(query: ThreadListQuery) -> Self {
        Self {
            limit: query.limit,
            offset: query.offset,
            include_direct: query.include_direct,
        }
    }
}

/// Message listing query string
#[derive(Debug, Default, Deserialize)]
pub struct MessageListQuery {
    pub limit: Option<i64>,
    pub before: Option<String>,
}

impl MessageListQuery {
    pub fn into_dto(self) -> Result<MessageQueryDto, AppError> {
        Ok(MessageQueryDto {
            limit: self.limit,
            before: self
                .before
                .as_deref()
                .map(|raw| parse_id(raw, "message"))
                .transpose()?,
        })
    }
}
