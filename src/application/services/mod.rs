//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **ChatService**: Threads, participants, direct conversations and messages
//! - **IdentityResolver**: Bearer credential verification

pub mod chat_service;
pub mod identity_service;

// Re-export chat service types
pub use chat_service::{
    AttachmentDto, ChatError, ChatService, ChatServiceImpl, CreateMessageDto, CreateThreadDto,
    DirectMessageDto, MessageDto, MessageQueryDto, MessagesPageDto, ParticipantDto, ThreadDto, ThreadQueryDto,
    DEFAULT_MESSAGE_LIMIT, DEFAULT_THREAD_LIMIT, MAX_PAGE_LIMIT,
};

// Re-export identity service types
pub use identity_service::{Claims, IdentityError, IdentityResolver, JwtIdentityResolver};
