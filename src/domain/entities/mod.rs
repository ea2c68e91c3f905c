//! # Domain Entities
//!
//! Core domain entities of the conversation subsystem. All entities map
//! directly to their corresponding database tables.
//!
//! ## Core Entities
//!
//! - **Thread**: A group thread or a direct conversation, with its participants
//! - **Message**: A text message in a thread, with attachment references
//!
//! ## Read-only Entities
//!
//! - **Account**: Owned by the identity subsystem; used for existence checks
//!   and display names
//! - **Upload**: Owned by the upload subsystem; referenced by attachments
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod account;
mod message;
mod thread;
mod upload;

pub use account::{Account, AccountRepository};
pub use message::{Message, MessageAttachment, MessageRepository, MAX_CONTENT_LENGTH};
pub use thread::{Participant, Thread, ThreadKind, ThreadRepository};
pub use upload::{Upload, UploadRepository};
