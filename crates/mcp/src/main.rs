//! Carlot MCP Server Binary
//!
//! ## Usage
//!
//! ```bash
//! # Serve the inventory in carlot.db over stdio
//! carlot-mcp
//!
//! # Serve a different database
//! CARLOT_DATABASE_URL=sqlite://demo.db carlot-mcp
//! ```
//!
//! Logs go to stderr; stdout carries the protocol.

use std::sync::Arc;

use anyhow::{Context, Result};
use carlot_core::config::{AppConfig, LoadOptions, LoggingConfig};
use carlot_db::{connect_with_config, migrations, InventoryRepository, SqlInventoryRepository};
use tracing::info;

fn init_logging(config: &LoggingConfig) {
    use carlot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_max_level(log_level);

    match config.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config.logging);

    info!(
        event_name = "mcp.startup",
        database_url = %config.database.url,
        "starting Carlot MCP server"
    );

    let pool = connect_with_config(&config.database)
        .await
        .with_context(|| format!("failed to connect to `{}`", config.database.url))?;
    migrations::run_pending(&pool).await.context("failed to apply migrations")?;

    let repository = SqlInventoryRepository::new(pool);
    let brands = repository.brands().await.context("inventory check failed")?;
    info!(
        event_name = "mcp.inventory.ready",
        brand_count = brands.len(),
        "inventory reachable"
    );

    carlot_mcp::CarlotMcpServer::new(Arc::new(repository)).run_stdio().await
}
