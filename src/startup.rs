//! Application Startup
//!
//! Application building and server initialization.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::{
    ChatService, ChatServiceImpl, IdentityResolver, JwtIdentityResolver,
};
use crate::config::Settings;
use crate::infrastructure::database;
use crate::infrastructure::repositories::{
    PgAccountRepository, PgMessageRepository, PgThreadRepository, PgUploadRepository,
};
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::ConnectionRegistry;
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub chat: Arc<dyn ChatService>,
    pub identity: Arc<dyn IdentityResolver>,
    pub registry: Arc<ConnectionRegistry>,
    pub settings: Arc<Settings>,
}

/// Router with every route plus the tracing and CORS layers.
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        handlers::health::init_server_start();

        let db = database::create_pool(&settings.database)
            .await
            .context("failed to create database pool")?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db)
                .await
                .context("failed to run database migrations")?;
            tracing::info!("Database migrations applied");
        }

        let edit_window = settings.chat.edit_window()?;
        let snowflake = Arc::new(SnowflakeGenerator::new(settings.snowflake.machine_id));

        let chat: Arc<dyn ChatService> = Arc::new(ChatServiceImpl::new(
            Arc::new(PgThreadRepository::new(db.clone())),
            Arc::new(PgMessageRepository::new(db.clone())),
            Arc::new(PgAccountRepository::new(db.clone())),
            Arc::new(PgUploadRepository::new(db.clone())),
            snowflake,
            edit_window,
        ));
        let identity: Arc<dyn IdentityResolver> =
            Arc::new(JwtIdentityResolver::from_settings(&settings.jwt));

        let addr = settings
            .server
            .socket_addr()
            .context("invalid server address")?;

        let state = AppState {
            db,
            chat,
            identity,
            registry: Arc::new(ConnectionRegistry::new()),
            settings: Arc::new(settings),
        };
        let router = build_router(state);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until Ctrl+C
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
