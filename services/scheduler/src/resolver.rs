//! Conflict resolver: free-slot computation for a user on a date
//!
//! Pulls the user's availability windows, subtracts unavailability
//! blocks and non-terminal meetings, and discretizes the remainder into
//! bookable slots. The same window computation runs on the booking
//! transaction's connection so request-time validation and slot listing
//! cannot diverge.

use chrono::NaiveDate;
use common::civil::{self, TimeRange};
use common::error::{SchedulingError, SchedulingResult};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::repositories::{availability, meeting};

/// Default slot length in minutes
pub const DEFAULT_GRANULARITY_MINUTES: u32 = 30;

const MIN_GRANULARITY_MINUTES: u32 = 5;
const MAX_GRANULARITY_MINUTES: u32 = 480;

/// Computes bookable slots against the availability store and the
/// meetings table
#[derive(Clone)]
pub struct ConflictResolver {
    pool: PgPool,
}

impl ConflictResolver {
    /// Create a new conflict resolver
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ordered, non-overlapping bookable slots for a user on a date.
    /// An empty list is a valid answer: a date with no applicable rules
    /// has no availability.
    pub async fn available_slots(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        granularity_minutes: u32,
    ) -> SchedulingResult<Vec<TimeRange>> {
        validate_granularity(granularity_minutes)?;

        let mut conn = self.pool.acquire().await.map_err(SchedulingError::from)?;
        let free = free_windows(&mut conn, user_id, date).await?;

        Ok(civil::discretize(&free, granularity_minutes))
    }
}

/// The user's free windows on a date, before discretization: availability
/// windows minus unavailability blocks minus non-terminal meetings.
///
/// Windows are defensively merged even though the store rejects
/// overlapping rules at write time.
pub async fn free_windows(
    conn: &mut PgConnection,
    user_id: Uuid,
    date: NaiveDate,
) -> SchedulingResult<Vec<TimeRange>> {
    let windows = civil::merge_ranges(availability::windows_for_date(conn, user_id, date).await?);
    if windows.is_empty() {
        return Ok(Vec::new());
    }

    let mut busy = availability::blocks_for_date(conn, user_id, date).await?;
    busy.extend(meeting::busy_ranges_on(conn, user_id, date).await?);

    Ok(civil::subtract_ranges(&windows, &civil::merge_ranges(busy)))
}

/// Whether the range lies entirely within one of the user's free
/// windows; this is the recipient-side booking check.
pub async fn range_is_free(
    conn: &mut PgConnection,
    user_id: Uuid,
    date: NaiveDate,
    range: TimeRange,
) -> SchedulingResult<bool> {
    let free = free_windows(conn, user_id, date).await?;
    Ok(free.iter().any(|window| window.contains(&range)))
}

/// Granularity bounds check
pub fn validate_granularity(granularity_minutes: u32) -> SchedulingResult<()> {
    if !(MIN_GRANULARITY_MINUTES..=MAX_GRANULARITY_MINUTES).contains(&granularity_minutes) {
        return Err(SchedulingError::Validation(format!(
            "granularity must be between {MIN_GRANULARITY_MINUTES} and {MAX_GRANULARITY_MINUTES} minutes"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granularity_bounds() {
        assert!(validate_granularity(DEFAULT_GRANULARITY_MINUTES).is_ok());
        assert!(validate_granularity(MIN_GRANULARITY_MINUTES).is_ok());
        assert!(validate_granularity(MAX_GRANULARITY_MINUTES).is_ok());
        assert!(validate_granularity(0).is_err());
        assert!(validate_granularity(4).is_err());
        assert!(validate_granularity(481).is_err());
    }
}
