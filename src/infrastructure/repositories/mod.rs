//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **ThreadRepository** - Threads, participants and direct-pair lookups
//! - **MessageRepository** - Messages with attachments, keyset pagination, soft delete
//! - **AccountRepository** - Read-only account lookups
//! - **UploadRepository** - Read-only upload lookups
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgMessageRepository, PgThreadRepository};
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let thread_repo = PgThreadRepository::new(pool.clone());
//!     let message_repo = PgMessageRepository::new(pool.clone());
//! }
//! ```

pub mod account_repository;
pub mod message_repository;
pub mod thread_repository;
pub mod upload_repository;

pub use account_repository::PgAccountRepository;
pub use message_repository::PgMessageRepository;
pub use thread_repository::PgThreadRepository;
pub use upload_repository::PgUploadRepository;
