//! WebSocket Gateway
//!
//! Real-time delivery of thread events to connected clients.

pub mod handler;
pub mod messages;
pub mod registry;
pub mod session;

pub use handler::{chat_ws_handler, direct_ws_handler, select_credential};
pub use messages::{ServerEvent, CLOSE_ACCESS_REFUSED, CLOSE_INTERNAL_ERROR, CLOSE_POLICY_VIOLATION};
pub use registry::{ConnectionHandle, ConnectionRegistry, OutboundFrame, Registration};
pub use session::{ChatSession, ConversationTarget, SessionEnd};
