//! Upload entity and repository trait.
//!
//! Uploads are stored by the file upload subsystem before a message references
//! them. Maps to the `uploads` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A previously stored file.
///
/// Maps to the `uploads` table:
/// - id: BIGINT PRIMARY KEY
/// - owner_id: BIGINT NOT NULL REFERENCES user_accounts(id)
/// - file_name: TEXT NOT NULL (original name)
/// - file_uuid_name: TEXT NOT NULL (name on disk)
/// - file_url: TEXT NOT NULL
/// - file_size: BIGINT NOT NULL (bytes)
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub id: i64,
    pub owner_id: i64,
    pub file_name: String,
    pub file_uuid_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}

impl Upload {
    /// Get the file extension from the original file name.
    pub fn extension(&self) -> Option<&str> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

/// Repository trait for Upload lookups.
#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// Find the uploads that exist among `ids`.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Upload>, AppError>;
}
