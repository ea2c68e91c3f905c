//! # Configuration Module
//!
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use thread_chat::config::Settings;
//!
//! let settings = Settings::load()?;
//! let edit_window = settings.chat.edit_window()?;
//! ```

mod settings;

pub use settings::*;
