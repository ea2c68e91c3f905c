//! Thread entity, participants and repository trait.
//!
//! Maps to the `chat_threads` and `chat_participants` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::DirectPair;
use crate::shared::error::AppError;

/// A user's membership in a thread.
///
/// Maps to the `chat_participants` table:
/// - thread_id: BIGINT NOT NULL REFERENCES chat_threads(id)
/// - user_id: BIGINT NOT NULL REFERENCES user_accounts(id)
/// - joined_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - active: BOOLEAN NOT NULL DEFAULT TRUE
/// - PRIMARY KEY (thread_id, user_id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub thread_id: i64,
    pub user_id: i64,
    pub joined_at: DateTime<Utc>,
    /// Inactive participants keep read access to history but can no longer post.
    pub active: bool,
}

/// A conversation: either a titled group thread or a direct pair.
///
/// Maps to the `chat_threads` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - is_direct: BOOLEAN NOT NULL
/// - title: VARCHAR(200) NULL
/// - created_by_id: BIGINT NOT NULL REFERENCES user_accounts(id)
/// - direct_key: TEXT NULL UNIQUE ("<low>:<high>" for direct threads)
/// - created_at / updated_at: TIMESTAMPTZ NOT NULL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: i64,
    pub is_direct: bool,
    pub title: Option<String>,
    pub created_by_id: i64,
    /// Set for direct threads only.
    pub direct_pair: Option<DirectPair>,
    pub created_at: DateTime<Utc>,
    /// Bumped on every new message; drives "most recent activity" ordering.
    pub updated_at: DateTime<Utc>,
    /// Ordered by join time.
    pub participants: Vec<Participant>,
}

impl Thread {
    /// Find the participant row for a user, active or not.
    pub fn participant(&self, user_id: i64) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Whether the user has ever joined this thread (read access).
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.participant(user_id).is_some()
    }

    /// Whether the user currently participates (write access).
    pub fn has_active_participant(&self, user_id: i64) -> bool {
        self.participant(user_id).map(|p| p.active).unwrap_or(false)
    }

    /// For direct threads, the other member of the pair relative to `user_id`.
    pub fn other_participant_id(&self, user_id: i64) -> Option<i64> {
        if !self.is_direct {
            return None;
        }
        match self.direct_pair {
            Some(pair) => pair.other(user_id),
            None => self
                .participants
                .iter()
                .map(|p| p.user_id)
                .find(|id| *id != user_id),
        }
    }
}

/// Which threads a participant listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadKind {
    All,
    Group,
    Direct,
}

impl ThreadKind {
    pub fn matches(&self, thread: &Thread) -> bool {
        match self {
            ThreadKind::All => true,
            ThreadKind::Group => !thread.is_direct,
            ThreadKind::Direct => thread.is_direct,
        }
    }
}

/// Repository trait for Thread data access operations.
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Find a thread with its participants.
    async fn find_by_id(&self, id: i64) -> Result<Option<Thread>, AppError>;

    /// Find the direct thread of a pair, if one exists.
    async fn find_direct(&self, pair: DirectPair) -> Result<Option<Thread>, AppError>;

    /// Insert a thread together with its participants in one unit of work.
    ///
    /// A second direct thread for the same pair is rejected by the store's
    /// uniqueness constraint and reported as `AppError::Conflict`.
    async fn create(&self, thread: &Thread) -> Result<Thread, AppError>;

    /// Insert new participants and reactivate inactive ones in one unit of
    /// work. Active participants are left untouched. Returns the refreshed thread.
    async fn upsert_participants(
        &self,
        thread_id: i64,
        participants: &[Participant],
    ) -> Result<Thread, AppError>;

    /// Flip a participant's active flag. Returns false if the row does not exist.
    async fn set_participant_active(
        &self,
        thread_id: i64,
        user_id: i64,
        active: bool,
    ) -> Result<bool, AppError>;

    /// Threads the user actively participates in, most recently updated first.
    async fn find_by_participant(
        &self,
        user_id: i64,
        kind: ThreadKind,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Thread>, AppError>;
}
