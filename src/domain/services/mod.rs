//! # Domain Services
//!
//! Pure domain policies that don't naturally belong to a single entity.
//!
//! ## Services
//!
//! - **EditWindow**: How long after creation a message may still be edited

mod edit_window;

pub use edit_window::{EditWindow, DEFAULT_EDIT_WINDOW_MINUTES, DEFAULT_WEEKDAY_EXTENSION_MINUTES};
