//! HTTP API
//!
//! REST endpoints for threads, messages and direct conversations.

pub mod extractors;
pub mod handlers;
pub mod routes;

pub use routes::create_router;
