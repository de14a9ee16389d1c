use std::net::SocketAddr;

use anyhow::Context;
use crowdfund::{config::AppConfig, create_app, db, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        identity = ?config.identity,
        storage = %config.storage_dir.display(),
        "configuration loaded"
    );

    let db = db::connect(&config.database_url, config.run_migrations)
        .await
        .context("failed to open database")?;
    tokio::fs::create_dir_all(&config.storage_dir)
        .await
        .with_context(|| format!("failed to create {}", config.storage_dir.display()))?;

    let bind_addr = config.bind_addr;
    let app = create_app(AppState::from_config(db, config));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("Server running on http://{bind_addr}");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
