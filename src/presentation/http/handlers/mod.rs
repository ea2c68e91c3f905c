//! HTTP Handlers

pub mod direct;
pub mod health;
pub mod message;
pub mod thread;
