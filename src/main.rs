//! # Thread Chat
//!
//! Entry point: tracing, configuration, database pool, HTTP/WebSocket server.

use anyhow::Result;
use tracing::info;

use thread_chat::config::Settings;
use thread_chat::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    thread_chat::telemetry::init_tracing();

    info!("Starting thread chat server...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
