use anyhow::Result;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::database::{DatabaseConfig, init_pool};
use sweeper::database::Database;
use sweeper::sweep::MeetingSweeper;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting meeting sweeper service");

    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    let database = Database::new(pool);

    let schedule = env::var("SWEEP_SCHEDULE").unwrap_or_else(|_| "0 * * * * *".to_string());
    let webhook_url = env::var("NOTIFY_WEBHOOK_URL").ok();
    let reminder_window_minutes = env::var("REMINDER_WINDOW_MINUTES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);

    let sweeper = MeetingSweeper::new(database, webhook_url, reminder_window_minutes);
    sweeper.start(&schedule).await?;

    info!("Meeting sweeper service started successfully");

    // Keep the service running
    tokio::signal::ctrl_c().await?;
    info!("Shutting down meeting sweeper service");

    Ok(())
}
