//! Repositories for database operations

use common::error::{SchedulingError, SchedulingResult};
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::models::UserRole;

pub mod analytics;
pub mod availability;
pub mod meeting;

/// Read-only lookups against the platform's user records. The
/// scheduling core does not manage users; it only needs existence and
/// role checks for meeting parties.
#[derive(Clone)]
pub struct UserDirectory {
    pool: PgPool,
}

impl UserDirectory {
    /// Create a new user directory
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a user's role, `None` if the user does not exist
    pub async fn find_role(&self, user_id: Uuid) -> SchedulingResult<Option<UserRole>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(SchedulingError::from)?;
        role_of(&mut conn, user_id).await
    }
}

/// Role lookup on an existing connection, usable inside a transaction
pub async fn role_of(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> SchedulingResult<Option<UserRole>> {
    let row = sqlx::query("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let role: String = row.get("role");
            Ok(Some(role.parse()?))
        }
        None => Ok(None),
    }
}
