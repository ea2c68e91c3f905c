//! Application settings and configuration structures.

use std::net::SocketAddr;

use chrono::Weekday;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::domain::services::{
    EditWindow, DEFAULT_EDIT_WINDOW_MINUTES, DEFAULT_WEEKDAY_EXTENSION_MINUTES,
};

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// JWT authentication settings
    pub jwt: JwtSettings,

    /// Snowflake ID generator settings
    pub snowflake: SnowflakeSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// WebSocket configuration
    pub websocket: WebSocketSettings,

    /// Message rules
    pub chat: ChatSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Apply pending migrations at startup
    pub run_migrations: bool,
}

/// JWT verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// HS256 secret shared with the token issuer
    pub secret: String,

    /// JWT IDs (`jti`) that are refused even while unexpired
    #[serde(default)]
    pub revoked_token_ids: Vec<String>,
}

/// Snowflake ID generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeSettings {
    /// Machine/worker ID (0-1023)
    pub machine_id: u16,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSettings {
    /// Maximum message size in bytes
    pub max_message_size: usize,

    /// Maximum frame size in bytes
    pub max_frame_size: usize,
}

/// Edit window policy.
///
/// Messages created on one of `extended_weekdays` (in `utc_offset_minutes`)
/// may be edited for `weekday_extension_minutes` longer.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSettings {
    pub edit_window_minutes: i64,
    pub weekday_extension_minutes: i64,
    pub extended_weekdays: Vec<String>,
    pub utc_offset_minutes: i32,
}

impl ChatSettings {
    /// Build the edit window, rejecting unknown weekday names.
    pub fn edit_window(&self) -> Result<EditWindow, ConfigError> {
        let weekdays = self
            .extended_weekdays
            .iter()
            .map(|day| {
                day.trim().parse::<Weekday>().map_err(|_| {
                    ConfigError::Message(format!("Unknown weekday in chat.extended_weekdays: {}", day))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        EditWindow::new(
            self.edit_window_minutes,
            self.weekday_extension_minutes,
            weekdays,
            self.utc_offset_minutes,
        )
        .map_err(|e| ConfigError::Message(format!("Invalid chat edit window: {}", e)))
    }
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. built-in defaults
    /// 2. config/default.toml and config/{RUN_ENV}.toml
    /// 3. `APP__SECTION__KEY` environment variables
    /// 4. `SERVER_HOST`, `SERVER_PORT`, `DATABASE_URL`, `JWT_SECRET`,
    ///    `SNOWFLAKE_MACHINE_ID`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if it fails [`Settings::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        let settings: Self = Self::defaults(Config::builder(), &environment)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .with_list_parse_key("jwt.revoked_token_ids")
                    .with_list_parse_key("chat.extended_weekdays")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option(
                "snowflake.machine_id",
                std::env::var("SNOWFLAKE_MACHINE_ID").ok(),
            )?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("jwt.revoked_token_ids", Vec::<String>::new())?
            .set_default("snowflake.machine_id", 1)?
            .set_default("cors.allowed_origins", Vec::<String>::new())?
            .set_default("websocket.max_message_size", 65536_i64)?
            .set_default("websocket.max_frame_size", 16384_i64)?
            .set_default("chat.edit_window_minutes", DEFAULT_EDIT_WINDOW_MINUTES)?
            .set_default(
                "chat.weekday_extension_minutes",
                DEFAULT_WEEKDAY_EXTENSION_MINUTES,
            )?
            .set_default("chat.extended_weekdays", vec!["Sat", "Sun"])?
            .set_default("chat.utc_offset_minutes", 0)
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                self.jwt.secret.len()
            )));
        }
        if self.snowflake.machine_id > 1023 {
            return Err(ConfigError::Message(
                "snowflake.machine_id must be between 0 and 1023".into(),
            ));
        }
        self.chat.edit_window()?;
        Ok(())
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ServerSettings {
    /// Get the socket address for binding.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}
