//! Availability store: persistence and validation of availability
//! rules and unavailability blocks
//!
//! Overlap rejection happens at write time, inside a transaction, with
//! the schema's exclusion constraints as the race-proof backstop. No
//! scheduling logic lives here.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use common::civil::{self, TimeRange};
use common::error::{SchedulingError, SchedulingResult};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::models::availability::{
    AvailabilityRule, CreateBlockRequest, CreateRuleRequest, UnavailabilityBlock,
};

/// Availability repository for database operations
#[derive(Clone)]
pub struct AvailabilityRepository {
    pool: PgPool,
}

impl AvailabilityRepository {
    /// Create a new availability repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an availability rule, rejecting malformed or overlapping
    /// rules before anything is persisted
    pub async fn create_rule(
        &self,
        user_id: Uuid,
        payload: &CreateRuleRequest,
    ) -> SchedulingResult<AvailabilityRule> {
        validate_rule(payload)?;

        let mut tx = self.pool.begin().await.map_err(SchedulingError::from)?;

        let overlapping = match (payload.day_of_week, payload.on_date) {
            (Some(day), None) => {
                sqlx::query_scalar::<_, bool>(
                    r#"
                    SELECT EXISTS (
                        SELECT 1 FROM availability_rules
                        WHERE user_id = $1 AND day_of_week = $2
                          AND start_time < $4 AND end_time > $3
                    )
                    "#,
                )
                .bind(user_id)
                .bind(day)
                .bind(payload.start_time)
                .bind(payload.end_time)
                .fetch_one(&mut *tx)
                .await?
            }
            (None, Some(date)) => {
                sqlx::query_scalar::<_, bool>(
                    r#"
                    SELECT EXISTS (
                        SELECT 1 FROM availability_rules
                        WHERE user_id = $1 AND on_date = $2
                          AND start_time < $4 AND end_time > $3
                    )
                    "#,
                )
                .bind(user_id)
                .bind(date)
                .bind(payload.start_time)
                .bind(payload.end_time)
                .fetch_one(&mut *tx)
                .await?
            }
            // validate_rule already rejected the other combinations
            _ => false,
        };

        if overlapping {
            return Err(SchedulingError::Validation(
                "rule overlaps an existing rule for the same day".to_string(),
            ));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO availability_rules (user_id, day_of_week, on_date, start_time, end_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, day_of_week, on_date, start_time, end_time, created_at
            "#,
        )
        .bind(user_id)
        .bind(payload.day_of_week)
        .bind(payload.on_date)
        .bind(payload.start_time)
        .bind(payload.end_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match SchedulingError::from(e) {
            // the exclusion constraint caught a concurrent writer; for
            // rules that is still a validation failure, not a booking
            // conflict
            SchedulingError::Conflict(_) => SchedulingError::Validation(
                "rule overlaps an existing rule for the same day".to_string(),
            ),
            other => other,
        })?;

        tx.commit().await.map_err(SchedulingError::from)?;

        Ok(rule_from_row(&row))
    }

    /// List all rules for a user, recurring and one-off
    pub async fn list_rules(&self, user_id: Uuid) -> SchedulingResult<Vec<AvailabilityRule>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, day_of_week, on_date, start_time, end_time, created_at
            FROM availability_rules
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(rule_from_row).collect())
    }

    /// Delete a rule owned by the user
    pub async fn delete_rule(&self, user_id: Uuid, rule_id: Uuid) -> SchedulingResult<()> {
        let result = sqlx::query("DELETE FROM availability_rules WHERE id = $1 AND user_id = $2")
            .bind(rule_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SchedulingError::NotFound("availability rule"));
        }

        Ok(())
    }

    /// Create an unavailability block
    pub async fn create_block(
        &self,
        user_id: Uuid,
        payload: &CreateBlockRequest,
    ) -> SchedulingResult<UnavailabilityBlock> {
        if payload.starts_at >= payload.ends_at {
            return Err(SchedulingError::Validation(
                "block start must be before block end".to_string(),
            ));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO unavailability_blocks (user_id, starts_at, ends_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, starts_at, ends_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(payload.starts_at)
        .bind(payload.ends_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(block_from_row(&row))
    }

    /// List all unavailability blocks for a user
    pub async fn list_blocks(&self, user_id: Uuid) -> SchedulingResult<Vec<UnavailabilityBlock>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, starts_at, ends_at, created_at
            FROM unavailability_blocks
            WHERE user_id = $1
            ORDER BY starts_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(block_from_row).collect())
    }

    /// Delete a block owned by the user
    pub async fn delete_block(&self, user_id: Uuid, block_id: Uuid) -> SchedulingResult<()> {
        let result = sqlx::query("DELETE FROM unavailability_blocks WHERE id = $1 AND user_id = $2")
            .bind(block_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SchedulingError::NotFound("unavailability block"));
        }

        Ok(())
    }
}

/// Candidate availability windows for a user on a date, with one-off
/// override semantics: when any one-off rule exists for the date, the
/// day is explicitly managed and recurring rules are ignored.
pub async fn windows_for_date(
    conn: &mut PgConnection,
    user_id: Uuid,
    date: NaiveDate,
) -> SchedulingResult<Vec<TimeRange>> {
    let one_off = sqlx::query(
        r#"
        SELECT start_time, end_time FROM availability_rules
        WHERE user_id = $1 AND on_date = $2
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_all(&mut *conn)
    .await?;

    let rows = if one_off.is_empty() {
        let weekday = i16::from(civil::day_of_week(date));
        sqlx::query(
            r#"
            SELECT start_time, end_time FROM availability_rules
            WHERE user_id = $1 AND day_of_week = $2
            "#,
        )
        .bind(user_id)
        .bind(weekday)
        .fetch_all(&mut *conn)
        .await?
    } else {
        one_off
    };

    Ok(rows
        .iter()
        .map(|row| TimeRange {
            start: row.get("start_time"),
            end: row.get("end_time"),
        })
        .collect())
}

/// Unavailability blocks overlapping a date, clipped to that date's
/// wall-clock range
pub async fn blocks_for_date(
    conn: &mut PgConnection,
    user_id: Uuid,
    date: NaiveDate,
) -> SchedulingResult<Vec<TimeRange>> {
    let day_start = date.and_time(NaiveTime::MIN);
    let day_end = date
        .checked_add_days(Days::new(1))
        .map(|next| next.and_time(NaiveTime::MIN));

    let rows = sqlx::query(
        r#"
        SELECT starts_at, ends_at FROM unavailability_blocks
        WHERE user_id = $1 AND starts_at < $3 AND ends_at > $2
        "#,
    )
    .bind(user_id)
    .bind(day_start)
    .bind(day_end.unwrap_or(NaiveDateTime::MAX))
    .fetch_all(&mut *conn)
    .await?;

    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);

    Ok(rows
        .iter()
        .filter_map(|row| {
            let starts_at: NaiveDateTime = row.get("starts_at");
            let ends_at: NaiveDateTime = row.get("ends_at");

            let start = if starts_at.date() < date {
                NaiveTime::MIN
            } else {
                starts_at.time()
            };
            let end = if ends_at.date() > date {
                end_of_day
            } else {
                ends_at.time()
            };

            TimeRange::new(start, end)
        })
        .collect())
}

fn rule_from_row(row: &PgRow) -> AvailabilityRule {
    AvailabilityRule {
        id: row.get("id"),
        user_id: row.get("user_id"),
        day_of_week: row.get("day_of_week"),
        on_date: row.get("on_date"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        created_at: row.get("created_at"),
    }
}

fn block_from_row(row: &PgRow) -> UnavailabilityBlock {
    UnavailabilityBlock {
        id: row.get("id"),
        user_id: row.get("user_id"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        created_at: row.get("created_at"),
    }
}

fn validate_rule(payload: &CreateRuleRequest) -> SchedulingResult<()> {
    if payload.start_time >= payload.end_time {
        return Err(SchedulingError::Validation(
            "rule start must be before rule end".to_string(),
        ));
    }

    match (payload.day_of_week, payload.on_date) {
        (Some(day), None) => {
            if !(0..=6).contains(&day) {
                return Err(SchedulingError::Validation(
                    "day_of_week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
                ));
            }
            Ok(())
        }
        (None, Some(_)) => Ok(()),
        _ => Err(SchedulingError::Validation(
            "a rule must set exactly one of day_of_week or on_date".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn base_request() -> CreateRuleRequest {
        CreateRuleRequest {
            day_of_week: Some(1),
            on_date: None,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        }
    }

    #[test]
    fn rejects_inverted_times() {
        let mut payload = base_request();
        payload.end_time = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert!(matches!(
            validate_rule(&payload),
            Err(SchedulingError::Validation(_))
        ));
    }

    #[test]
    fn rejects_rule_with_both_kinds() {
        let mut payload = base_request();
        payload.on_date = NaiveDate::from_ymd_opt(2025, 6, 2);
        assert!(matches!(
            validate_rule(&payload),
            Err(SchedulingError::Validation(_))
        ));
    }

    #[test]
    fn rejects_rule_with_neither_kind() {
        let mut payload = base_request();
        payload.day_of_week = None;
        assert!(matches!(
            validate_rule(&payload),
            Err(SchedulingError::Validation(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_weekday() {
        let mut payload = base_request();
        payload.day_of_week = Some(7);
        assert!(matches!(
            validate_rule(&payload),
            Err(SchedulingError::Validation(_))
        ));
    }

    #[test]
    fn accepts_well_formed_rules() {
        assert!(validate_rule(&base_request()).is_ok());

        let mut one_off = base_request();
        one_off.day_of_week = None;
        one_off.on_date = NaiveDate::from_ymd_opt(2025, 6, 2);
        assert!(validate_rule(&one_off).is_ok());
    }
}
