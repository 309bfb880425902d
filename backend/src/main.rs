use std::sync::Arc;

use oracle_aggregator::{
    api::{create_router, AppState},
    config::{Config, OracleSetConfig},
    feeds::InMemoryFeedStore,
    telemetry, OracleRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    telemetry::init_tracing(&config.log_filter);
    tracing::info!("🚀 Starting Oracle Aggregator Service...");

    // Build every configured oracle
    tracing::info!("📊 Loading oracle set from {}...", config.oracle_config_path);
    let oracle_set = OracleSetConfig::from_file(&config.oracle_config_path)?;
    let feeds = Arc::new(InMemoryFeedStore::new());
    let registry = OracleRegistry::from_config(&oracle_set, feeds)?;

    let app = create_router(AppState::new(Arc::new(registry)));

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("🌐 Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
