//! # Chat Rooms
//!
//! Application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Room storage (memory or PostgreSQL)
//! - HTTP server

use anyhow::Result;
use tracing::info;

use chat_rooms::config::Settings;
use chat_rooms::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    chat_rooms::telemetry::init_tracing();

    info!("Starting Chat Rooms...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        storage = ?settings.rooms.storage,
        lock_timeout_ms = ?settings.rooms.lock_timeout_ms,
        environment = %settings.environment,
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
