//! Data Transfer Objects
//!
//! DTOs for API request/response serialization.

pub mod request;
pub mod response;

pub use request::{
    AddParticipantsRequest, CreateThreadRequest, DirectConversationRequest, DirectMessageRequest,
    EditMessageRequest, MessageListQuery, SendMessageRequest, ThreadListQuery,
};
pub use response::{ApiResponse, MessageDeletedResponse, MessagesDeletedResponse};
