//! Message Repository Implementation
//!
//! PostgreSQL implementation of message operations with keyset pagination and
//! soft deletion.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Message, MessageAttachment, MessageRepository};
use crate::infrastructure::database::TransactionContext;
use crate::shared::error::AppError;

/// PostgreSQL message repository implementation.
///
/// Provides message storage and retrieval with:
/// - Cursor-based pagination for infinite scroll
/// - Atomic message + attachment inserts
/// - Soft deletion that keeps rows for audit
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Creates a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load attachment references for the given messages, in position order.
    async fn load_attachments(
        &self,
        message_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<MessageAttachment>>, AppError> {
        if message_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT message_id, upload_id
            FROM chat_message_attachments
            WHERE message_id = ANY($1)
            ORDER BY message_id, position
            "#,
        )
        .bind(message_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<MessageAttachment>> = HashMap::new();
        for row in rows {
            grouped.entry(row.message_id).or_default().push(MessageAttachment {
                message_id: row.message_id,
                upload_id: row.upload_id,
            });
        }
        Ok(grouped)
    }

    async fn assemble(&self, rows: Vec<MessageRow>) -> Result<Vec<Message>, AppError> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut attachments = self.load_attachments(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let refs = attachments.remove(&row.id).unwrap_or_default();
                row.into_message(refs)
            })
            .collect())
    }
}

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    thread_id: i64,
    sender_id: i64,
    content: String,
    created_at: DateTime<Utc>,
    edited_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

impl MessageRow {
    /// Converts database row to domain Message entity.
    fn into_message(self, attachments: Vec<MessageAttachment>) -> Message {
        Message {
            id: self.id,
            thread_id: self.thread_id,
            sender_id: self.sender_id,
            content: self.content,
            created_at: self.created_at,
            edited_at: self.edited_at,
            deleted_at: self.deleted_at,
            attachments,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AttachmentRow {
    message_id: i64,
    upload_id: i64,
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, thread_id, sender_id, content, created_at, edited_at, deleted_at
            FROM chat_messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Messages are returned in descending id order (newest first).
    async fn find_by_thread(
        &self,
        thread_id: i64,
        before: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, thread_id, sender_id, content, created_at, edited_at, deleted_at
            FROM chat_messages
            WHERE thread_id = $1
              AND deleted_at IS NULL
              AND ($2::bigint IS NULL OR id < $2)
            ORDER BY id DESC
            LIMIT $3
            "#,
        )
        .bind(thread_id)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.assemble(rows).await
    }

    async fn find_latest(&self, thread_ids: &[i64]) -> Result<Vec<Message>, AppError> {
        if thread_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT DISTINCT ON (thread_id)
                   id, thread_id, sender_id, content, created_at, edited_at, deleted_at
            FROM chat_messages
            WHERE thread_id = ANY($1) AND deleted_at IS NULL
            ORDER BY thread_id, id DESC
            "#,
        )
        .bind(thread_ids)
        .fetch_all(&self.pool)
        .await?;

        self.assemble(rows).await
    }

    /// Insert the message, its attachment references and the thread recency
    /// bump in one transaction.
    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        let mut tx = TransactionContext::begin(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, thread_id, sender_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.id)
        .bind(message.thread_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.created_at)
        .execute(tx.conn())
        .await?;

        for (position, attachment) in message.attachments.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO chat_message_attachments (message_id, upload_id, position)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(message.id)
            .bind(attachment.upload_id)
            .bind(position as i32)
            .execute(tx.conn())
            .await?;
        }

        sqlx::query("UPDATE chat_threads SET updated_at = $2 WHERE id = $1")
            .bind(message.thread_id)
            .bind(message.created_at)
            .execute(tx.conn())
            .await?;

        tx.commit().await?;
        Ok(message.clone())
    }

    async fn update_content(
        &self,
        id: i64,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            UPDATE chat_messages
            SET content = $2, edited_at = $3
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, thread_id, sender_id, content, created_at, edited_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(content)
        .bind(edited_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn soft_delete(&self, id: i64, deleted_at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE chat_messages SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete_by_thread(
        &self,
        thread_id: i64,
        deleted_at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE chat_messages SET deleted_at = $2 WHERE thread_id = $1 AND deleted_at IS NULL",
        )
        .bind(thread_id)
        .bind(deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
