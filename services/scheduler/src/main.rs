use anyhow::Result;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::database::{DatabaseConfig, init_pool, run_migrations};
use scheduler::lifecycle::LifecycleManager;
use scheduler::middleware::JwtVerifier;
use scheduler::notifier::Notifier;
use scheduler::repositories::{
    UserDirectory, analytics::AnalyticsRepository, availability::AvailabilityRepository,
    meeting::MeetingRepository,
};
use scheduler::resolver::ConflictResolver;
use scheduler::routes;
use scheduler::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting scheduler service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;
    info!("Database migrations applied");

    let jwt = JwtVerifier::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let notifier = Notifier::from_env();

    let app_state = AppState {
        db_pool: pool.clone(),
        jwt,
        users: UserDirectory::new(pool.clone()),
        availability: AvailabilityRepository::new(pool.clone()),
        meetings: MeetingRepository::new(pool.clone()),
        analytics: AnalyticsRepository::new(pool.clone()),
        resolver: ConflictResolver::new(pool.clone()),
        lifecycle: LifecycleManager::new(pool, notifier),
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Scheduler service listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
