//! Message entity and repository trait.
//!
//! Maps to the `chat_messages` and `chat_message_attachments` tables in the
//! database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Maximum message length in characters.
pub const MAX_CONTENT_LENGTH: usize = 4000;

/// Reference from a message to a previously stored upload.
///
/// Maps to the `chat_message_attachments` table:
/// - message_id: BIGINT NOT NULL REFERENCES chat_messages(id)
/// - upload_id: BIGINT NOT NULL REFERENCES uploads(id)
/// - position: INTEGER NOT NULL (order within the message)
/// - PRIMARY KEY (message_id, upload_id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttachment {
    pub message_id: i64,
    pub upload_id: i64,
}

/// Represents a message in a thread.
///
/// Maps to the `chat_messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - thread_id: BIGINT NOT NULL REFERENCES chat_threads(id)
/// - sender_id: BIGINT NOT NULL REFERENCES user_accounts(id)
/// - content: TEXT NOT NULL (max 4000 characters)
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - edited_at: TIMESTAMPTZ NULL
/// - deleted_at: TIMESTAMPTZ NULL (soft delete marker)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID (primary key)
    pub id: i64,

    pub thread_id: i64,

    pub sender_id: i64,

    /// Message content (up to 4000 characters)
    pub content: String,

    pub created_at: DateTime<Utc>,

    /// Timestamp of the last edit (None if never edited)
    pub edited_at: Option<DateTime<Utc>>,

    /// Set once the message is soft-deleted; the row is kept.
    pub deleted_at: Option<DateTime<Utc>>,

    /// Attachment references in the order they were given.
    pub attachments: Vec<MessageAttachment>,
}

impl Message {
    pub fn is_edited(&self) -> bool {
        self.edited_at.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Upload ids referenced by this message, in order.
    pub fn upload_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.attachments.iter().map(|a| a.upload_id)
    }
}

/// Repository trait for Message data access operations.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find a message by its Snowflake ID, deleted or not.
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// Visible messages of a thread, newest first.
    ///
    /// Uses keyset pagination: with `before` set only messages with a smaller
    /// id are returned.
    async fn find_by_thread(
        &self,
        thread_id: i64,
        before: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Message>, AppError>;

    /// Latest visible message of each given thread. Threads without one are absent.
    async fn find_latest(&self, thread_ids: &[i64]) -> Result<Vec<Message>, AppError>;

    /// Insert a message with its attachment references and bump the thread's
    /// `updated_at`, all in one unit of work.
    async fn create(&self, message: &Message) -> Result<Message, AppError>;

    /// Replace the content of a visible message. Returns `None` if the message
    /// is missing or was deleted meanwhile.
    async fn update_content(
        &self,
        id: i64,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<Option<Message>, AppError>;

    /// Mark a visible message deleted. Returns false if nothing changed.
    async fn soft_delete(&self, id: i64, deleted_at: DateTime<Utc>) -> Result<bool, AppError>;

    /// Mark every visible message of a thread deleted. Returns the count.
    async fn soft_delete_by_thread(
        &self,
        thread_id: i64,
        deleted_at: DateTime<Utc>,
    ) -> Result<u64, AppError>;
}
