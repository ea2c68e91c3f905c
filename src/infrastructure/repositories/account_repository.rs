//! Account Repository Implementation
//!
//! Read-only access to `user_accounts`.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{Account, AccountRepository};
use crate::shared::error::AppError;

pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    username: String,
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Account>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT id, username FROM user_accounts WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Account {
                id: row.id,
                username: row.username,
            })
            .collect())
    }
}
