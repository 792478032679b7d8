//! Application state shared across handlers

use sqlx::PgPool;

use crate::lifecycle::LifecycleManager;
use crate::middleware::JwtVerifier;
use crate::repositories::{
    UserDirectory, analytics::AnalyticsRepository, availability::AvailabilityRepository,
    meeting::MeetingRepository,
};
use crate::resolver::ConflictResolver;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt: JwtVerifier,
    pub users: UserDirectory,
    pub availability: AvailabilityRepository,
    pub meetings: MeetingRepository,
    pub analytics: AnalyticsRepository,
    pub resolver: ConflictResolver,
    pub lifecycle: LifecycleManager,
}
