use std::env;
use std::time::Duration;

use crowdfund::config::AppConfig;
use crowdfund::db;
use crowdfund::jobs::reconcile_totals;
use tokio::time::interval;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing (INFO unless RUST_LOG says otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let db = db::connect(&config.database_url, config.run_migrations).await?;

    let run_once = env::args().any(|a| a == "--once");
    if run_once {
        let report = reconcile_totals(&db).await?;
        info!(
            checked = report.campaigns_checked,
            corrected = report.campaigns_corrected,
            "reconcile pass finished"
        );
        return Ok(());
    }

    info!("Worker starting; reconciling campaign totals every 15 minutes");

    let mut ticker = interval(Duration::from_secs(15 * 60));
    loop {
        ticker.tick().await;
        match reconcile_totals(&db).await {
            Ok(report) => info!(
                checked = report.campaigns_checked,
                corrected = report.campaigns_corrected,
                "reconcile pass finished"
            ),
            Err(e) => error!(error = %e, "reconcile pass failed"),
        }
    }
}
