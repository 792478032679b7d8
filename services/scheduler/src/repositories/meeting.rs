//! Meeting persistence: row access plus the transactional primitives
//! the lifecycle manager composes
//!
//! Every non-terminal meeting is shadowed by one hold row per party in
//! `meeting_holds`; the exclusion constraint on that table is what
//! makes concurrent booking attempts safe. Holds are inserted with the
//! meeting and released on terminal transitions.

use chrono::{NaiveDate, Utc};
use common::civil::TimeRange;
use common::error::{SchedulingError, SchedulingResult};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::models::meeting::{Meeting, MeetingRating, MeetingStatus};

const MEETING_COLUMNS: &str = r#"
    id, requestor_id, recipient_id, title, description,
    meeting_date, start_time, end_time, meeting_type, status,
    decline_reason,
    requestor_success_rating, requestor_platform_rating,
    recipient_success_rating, recipient_platform_rating,
    created_at, updated_at
"#;

/// Meeting repository for database operations
#[derive(Clone)]
pub struct MeetingRepository {
    pool: PgPool,
}

impl MeetingRepository {
    /// Create a new meeting repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a meeting by ID
    pub async fn find_by_id(&self, meeting_id: Uuid) -> SchedulingResult<Option<Meeting>> {
        let row = sqlx::query(&format!(
            "SELECT {MEETING_COLUMNS} FROM meetings WHERE id = $1"
        ))
        .bind(meeting_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(meeting_from_row).transpose()
    }

    /// All meetings the user is a party to, newest date first
    pub async fn list_for_user(&self, user_id: Uuid) -> SchedulingResult<Vec<Meeting>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MEETING_COLUMNS} FROM meetings
            WHERE requestor_id = $1 OR recipient_id = $1
            ORDER BY meeting_date DESC, start_time DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(meeting_from_row).collect()
    }
}

/// Fetch a meeting with a row lock, for use inside a lifecycle
/// transaction
pub async fn fetch_for_update(
    conn: &mut PgConnection,
    meeting_id: Uuid,
) -> SchedulingResult<Option<Meeting>> {
    let row = sqlx::query(&format!(
        "SELECT {MEETING_COLUMNS} FROM meetings WHERE id = $1 FOR UPDATE"
    ))
    .bind(meeting_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(meeting_from_row).transpose()
}

/// Time ranges of the user's non-terminal meetings on a date,
/// whichever side of the meeting they are on. A `requested` meeting
/// provisionally reserves its slot, so it counts as busy.
pub async fn busy_ranges_on(
    conn: &mut PgConnection,
    user_id: Uuid,
    date: NaiveDate,
) -> SchedulingResult<Vec<TimeRange>> {
    let rows = sqlx::query(
        r#"
        SELECT start_time, end_time FROM meetings
        WHERE (requestor_id = $1 OR recipient_id = $1)
          AND meeting_date = $2
          AND status IN ('requested', 'accepted')
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .iter()
        .map(|row| TimeRange {
            start: row.get("start_time"),
            end: row.get("end_time"),
        })
        .collect())
}

/// Whether the user has a non-terminal meeting overlapping the range,
/// optionally excluding one meeting (the one being transitioned)
pub async fn has_overlapping_meeting(
    conn: &mut PgConnection,
    user_id: Uuid,
    date: NaiveDate,
    range: TimeRange,
    exclude: Option<Uuid>,
) -> SchedulingResult<bool> {
    let overlapping = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM meetings
            WHERE (requestor_id = $1 OR recipient_id = $1)
              AND meeting_date = $2
              AND status IN ('requested', 'accepted')
              AND start_time < $4 AND end_time > $3
              AND ($5::uuid IS NULL OR id <> $5)
        )
        "#,
    )
    .bind(user_id)
    .bind(date)
    .bind(range.start)
    .bind(range.end)
    .bind(exclude)
    .fetch_one(&mut *conn)
    .await?;

    Ok(overlapping)
}

/// Insert a new meeting in `requested` state together with both
/// parties' holds. The hold inserts are where a concurrent booking for
/// an overlapping slot fails, surfacing as `Conflict`.
pub async fn insert_requested(
    conn: &mut PgConnection,
    requestor_id: Uuid,
    recipient_id: Uuid,
    title: &str,
    description: &str,
    date: NaiveDate,
    range: TimeRange,
    meeting_type: &str,
) -> SchedulingResult<Meeting> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO meetings
            (requestor_id, recipient_id, title, description,
             meeting_date, start_time, end_time, meeting_type)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {MEETING_COLUMNS}
        "#
    ))
    .bind(requestor_id)
    .bind(recipient_id)
    .bind(title)
    .bind(description)
    .bind(date)
    .bind(range.start)
    .bind(range.end)
    .bind(meeting_type)
    .fetch_one(&mut *conn)
    .await?;

    let meeting = meeting_from_row(&row)?;

    for party in [requestor_id, recipient_id] {
        sqlx::query(
            r#"
            INSERT INTO meeting_holds (meeting_id, user_id, meeting_date, start_time, end_time)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(meeting.id)
        .bind(party)
        .bind(date)
        .bind(range.start)
        .bind(range.end)
        .execute(&mut *conn)
        .await?;
    }

    Ok(meeting)
}

/// Update a meeting's status, storing the decline reason when given
pub async fn set_status(
    conn: &mut PgConnection,
    meeting_id: Uuid,
    status: MeetingStatus,
    decline_reason: Option<&str>,
) -> SchedulingResult<()> {
    sqlx::query(
        r#"
        UPDATE meetings
        SET status = $2, decline_reason = COALESCE($3, decline_reason), updated_at = $4
        WHERE id = $1
        "#,
    )
    .bind(meeting_id)
    .bind(status.as_str())
    .bind(decline_reason)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Release both parties' holds; called on every terminal transition
pub async fn release_holds(conn: &mut PgConnection, meeting_id: Uuid) -> SchedulingResult<()> {
    sqlx::query("DELETE FROM meeting_holds WHERE meeting_id = $1")
        .bind(meeting_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Store one party's rating pair. `as_requestor` selects which pair of
/// columns the rating lands in; each party rates independently.
pub async fn set_rating(
    conn: &mut PgConnection,
    meeting_id: Uuid,
    as_requestor: bool,
    rating: MeetingRating,
) -> SchedulingResult<()> {
    let query = if as_requestor {
        r#"
        UPDATE meetings
        SET requestor_success_rating = $2, requestor_platform_rating = $3, updated_at = $4
        WHERE id = $1
        "#
    } else {
        r#"
        UPDATE meetings
        SET recipient_success_rating = $2, recipient_platform_rating = $3, updated_at = $4
        WHERE id = $1
        "#
    };

    sqlx::query(query)
        .bind(meeting_id)
        .bind(rating.success)
        .bind(rating.platform)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Map a meetings row into the domain model
pub fn meeting_from_row(row: &PgRow) -> SchedulingResult<Meeting> {
    let status: String = row.get("status");
    let meeting_type: String = row.get("meeting_type");

    let requestor_rating = rating_from_columns(
        row.get("requestor_success_rating"),
        row.get("requestor_platform_rating"),
    );
    let recipient_rating = rating_from_columns(
        row.get("recipient_success_rating"),
        row.get("recipient_platform_rating"),
    );

    Ok(Meeting {
        id: row.get("id"),
        requestor_id: row.get("requestor_id"),
        recipient_id: row.get("recipient_id"),
        title: row.get("title"),
        description: row.get("description"),
        meeting_date: row.get("meeting_date"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        meeting_type: meeting_type
            .parse()
            .map_err(|_| SchedulingError::Internal(format!("unknown meeting type: {meeting_type}")))?,
        status: status.parse()?,
        decline_reason: row.get("decline_reason"),
        requestor_rating,
        recipient_rating,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn rating_from_columns(success: Option<i16>, platform: Option<i16>) -> Option<MeetingRating> {
    match (success, platform) {
        (Some(success), Some(platform)) => Some(MeetingRating { success, platform }),
        _ => None,
    }
}
