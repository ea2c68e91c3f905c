//! Thread Repository Implementation
//!
//! PostgreSQL implementation of thread and participant operations. Threads
//! are always loaded together with their participants.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{DirectPair, Participant, Thread, ThreadKind, ThreadRepository};
use crate::infrastructure::database::TransactionContext;
use crate::shared::error::AppError;

/// PostgreSQL thread repository implementation.
pub struct PgThreadRepository {
    pool: PgPool,
}

impl PgThreadRepository {
    /// Creates a new PgThreadRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load participants for the given threads, ordered by join time.
    async fn load_participants(
        &self,
        thread_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Participant>>, AppError> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT thread_id, user_id, joined_at, active
            FROM chat_participants
            WHERE thread_id = ANY($1)
            ORDER BY joined_at ASC, user_id ASC
            "#,
        )
        .bind(thread_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<Participant>> = HashMap::new();
        for row in rows {
            grouped.entry(row.thread_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn assemble(&self, rows: Vec<ThreadRow>) -> Result<Vec<Thread>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut participants = self.load_participants(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let members = participants.remove(&row.id).unwrap_or_default();
                row.into_thread(members)
            })
            .collect())
    }

    async fn assemble_one(&self, row: Option<ThreadRow>) -> Result<Option<Thread>, AppError> {
        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

/// Internal row type for thread queries.
#[derive(Debug, sqlx::FromRow)]
struct ThreadRow {
    id: i64,
    is_direct: bool,
    title: Option<String>,
    created_by_id: i64,
    direct_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ThreadRow {
    fn into_thread(self, participants: Vec<Participant>) -> Thread {
        Thread {
            id: self.id,
            is_direct: self.is_direct,
            title: self.title,
            created_by_id: self.created_by_id,
            direct_pair: self.direct_key.as_deref().and_then(DirectPair::from_key),
            created_at: self.created_at,
            updated_at: self.updated_at,
            participants,
        }
    }
}

/// Internal row type for participant queries.
#[derive(Debug, sqlx::FromRow)]
struct ParticipantRow {
    thread_id: i64,
    user_id: i64,
    joined_at: DateTime<Utc>,
    active: bool,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Participant {
            thread_id: row.thread_id,
            user_id: row.user_id,
            joined_at: row.joined_at,
            active: row.active,
        }
    }
}

const THREAD_COLUMNS: &str =
    "t.id, t.is_direct, t.title, t.created_by_id, t.direct_key, t.created_at, t.updated_at";

#[async_trait]
impl ThreadRepository for PgThreadRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Thread>, AppError> {
        let row = sqlx::query_as::<_, ThreadRow>(&format!(
            "SELECT {THREAD_COLUMNS} FROM chat_threads t WHERE t.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.assemble_one(row).await
    }

    async fn find_direct(&self, pair: DirectPair) -> Result<Option<Thread>, AppError> {
        let row = sqlx::query_as::<_, ThreadRow>(&format!(
            "SELECT {THREAD_COLUMNS} FROM chat_threads t WHERE t.direct_key = $1"
        ))
        .bind(pair.key())
        .fetch_optional(&self.pool)
        .await?;

        self.assemble_one(row).await
    }

    /// Insert the thread and its participants in one transaction.
    ///
    /// A duplicate `direct_key` fails the insert with a unique violation,
    /// which `AppError::from` reports as `Conflict`.
    async fn create(&self, thread: &Thread) -> Result<Thread, AppError> {
        let mut tx = TransactionContext::begin(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO chat_threads (id, is_direct, title, created_by_id, direct_key, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(thread.id)
        .bind(thread.is_direct)
        .bind(&thread.title)
        .bind(thread.created_by_id)
        .bind(thread.direct_pair.map(|pair| pair.key()))
        .bind(thread.created_at)
        .bind(thread.updated_at)
        .execute(tx.conn())
        .await?;

        for participant in &thread.participants {
            sqlx::query(
                r#"
                INSERT INTO chat_participants (thread_id, user_id, joined_at, active)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(thread.id)
            .bind(participant.user_id)
            .bind(participant.joined_at)
            .bind(participant.active)
            .execute(tx.conn())
            .await?;
        }

        tx.commit().await?;
        Ok(thread.clone())
    }

    async fn upsert_participants(
        &self,
        thread_id: i64,
        participants: &[Participant],
    ) -> Result<Thread, AppError> {
        let mut tx = TransactionContext::begin(&self.pool).await?;

        for participant in participants {
            sqlx::query(
                r#"
                INSERT INTO chat_participants (thread_id, user_id, joined_at, active)
                VALUES ($1, $2, $3, TRUE)
                ON CONFLICT (thread_id, user_id)
                DO UPDATE SET active = TRUE
                WHERE chat_participants.active = FALSE
                "#,
            )
            .bind(thread_id)
            .bind(participant.user_id)
            .bind(participant.joined_at)
            .execute(tx.conn())
            .await?;
        }

        tx.commit().await?;

        self.find_by_id(thread_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Thread not found".into()))
    }

    async fn set_participant_active(
        &self,
        thread_id: i64,
        user_id: i64,
        active: bool,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE chat_participants SET active = $3 WHERE thread_id = $1 AND user_id = $2",
        )
        .bind(thread_id)
        .bind(user_id)
        .bind(active)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_participant(
        &self,
        user_id: i64,
        kind: ThreadKind,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Thread>, AppError> {
        let is_direct = match kind {
            ThreadKind::All => None,
            ThreadKind::Group => Some(false),
            ThreadKind::Direct => Some(true),
        };

        let rows = sqlx::query_as::<_, ThreadRow>(&format!(
            r#"
            SELECT {THREAD_COLUMNS}
            FROM chat_threads t
            JOIN chat_participants p ON p.thread_id = t.id
            WHERE p.user_id = $1
              AND p.active = TRUE
              AND ($2::boolean IS NULL OR t.is_direct = $2)
            ORDER BY t.updated_at DESC, t.id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id)
        .bind(is_direct)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        self.assemble(rows).await
    }
}
