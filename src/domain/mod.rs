//! # Domain Layer
//!
//! The domain layer contains the core rules of the conversation subsystem.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Core domain entities (Thread, Message, Account, Upload)
//! - **value_objects**: Immutable value types (DirectPair)
//! - **services**: Pure domain policies (EditWindow)
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Entities encapsulate domain behavior

pub mod entities;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use services::*;
pub use value_objects::*;
