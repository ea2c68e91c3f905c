//! Account entity and repository trait.
//!
//! Accounts are owned by the identity subsystem; this crate only reads them to
//! verify that a user id exists and to render display names.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A user account as seen by the chat subsystem.
///
/// Maps to the `user_accounts` table:
/// - id: BIGINT PRIMARY KEY
/// - username: VARCHAR(64) NOT NULL UNIQUE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
}

/// Repository trait for Account lookups.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find the accounts that exist among `ids`. Missing ids are simply absent
    /// from the result.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Account>, AppError>;
}
