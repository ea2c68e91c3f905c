//! # Thread Chat
//!
//! Chat backend for group threads and one-to-one direct conversations:
//! - REST API for threads, participants and messages
//! - WebSocket endpoints that push message events to every live connection
//!   of a thread
//! - PostgreSQL storage with soft-deleted messages and an edit window
//!
//! ## Architecture
//!
//! - **Domain Layer**: entities, repository traits, edit window policy
//! - **Application Layer**: chat and identity services, DTOs
//! - **Infrastructure Layer**: PostgreSQL repositories, metrics
//! - **Presentation Layer**: HTTP handlers and the realtime gateway
//!
//! ```text
//! thread_chat/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, repository traits
//! +-- application/    Services and DTOs
//! +-- infrastructure/ Database, repositories, metrics
//! +-- presentation/   HTTP routes, middleware, WebSocket gateway
//! +-- shared/         Errors, snowflake IDs, validation helpers
//! ```

pub mod config;

pub mod domain;

pub mod application;

pub mod infrastructure;

pub mod presentation;

pub mod shared;

pub mod startup;

pub mod telemetry;
