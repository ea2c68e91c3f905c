//! Upload Repository Implementation
//!
//! Read-only access to files stored by the upload subsystem.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Upload, UploadRepository};
use crate::shared::error::AppError;

pub struct PgUploadRepository {
    pool: PgPool,
}

impl PgUploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UploadRow {
    id: i64,
    owner_id: i64,
    file_name: String,
    file_uuid_name: String,
    file_url: String,
    file_size: i64,
    created_at: DateTime<Utc>,
}

impl From<UploadRow> for Upload {
    fn from(row: UploadRow) -> Self {
        Upload {
            id: row.id,
            owner_id: row.owner_id,
            file_name: row.file_name,
            file_uuid_name: row.file_uuid_name,
            file_url: row.file_url,
            file_size: row.file_size,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UploadRepository for PgUploadRepository {
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Upload>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UploadRow>(
            r#"
            SELECT id, owner_id, file_name, file_uuid_name, file_url, file_size, created_at
            FROM uploads
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Upload::from).collect())
    }
}
