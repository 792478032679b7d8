//! Sweep queries against the meetings table
//!
//! Wall-clock comparisons use LOCALTIMESTAMP; deployments pin the
//! database session timezone to the platform timezone.

use anyhow::Result;
use sqlx::PgPool;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::models::MeetingSnapshot;

/// Sweeper's database handle
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database handle
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Flip every elapsed `accepted` meeting to `completed` and release
    /// its holds. Idempotent: completed meetings no longer match, so a
    /// second run is a no-op.
    pub async fn complete_elapsed(&self) -> Result<Vec<MeetingSnapshot>> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            UPDATE meetings
            SET status = 'completed', updated_at = now()
            WHERE status = 'accepted'
              AND meeting_date + end_time < LOCALTIMESTAMP
            RETURNING id, requestor_id, recipient_id, title,
                      meeting_date, start_time, end_time, meeting_type, status
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let completed: Vec<MeetingSnapshot> = rows.iter().map(snapshot_from_row).collect();

        if !completed.is_empty() {
            let ids: Vec<Uuid> = completed.iter().map(|m| m.id).collect();
            sqlx::query("DELETE FROM meeting_holds WHERE meeting_id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(completed)
    }

    /// Accepted meetings starting within the next `window_minutes` that
    /// have not been reminded yet; marks them reminded so each meeting
    /// gets at most one reminder.
    pub async fn claim_due_reminders(&self, window_minutes: i32) -> Result<Vec<MeetingSnapshot>> {
        let rows = sqlx::query(
            r#"
            UPDATE meetings
            SET reminder_sent_at = now()
            WHERE status = 'accepted'
              AND reminder_sent_at IS NULL
              AND meeting_date + start_time >= LOCALTIMESTAMP
              AND meeting_date + start_time < LOCALTIMESTAMP + make_interval(mins => $1)
            RETURNING id, requestor_id, recipient_id, title,
                      meeting_date, start_time, end_time, meeting_type, status
            "#,
        )
        .bind(window_minutes)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(snapshot_from_row).collect())
    }
}

fn snapshot_from_row(row: &PgRow) -> MeetingSnapshot {
    MeetingSnapshot {
        id: row.get("id"),
        requestor_id: row.get("requestor_id"),
        recipient_id: row.get("recipient_id"),
        title: row.get("title"),
        meeting_date: row.get("meeting_date"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        meeting_type: row.get("meeting_type"),
        status: row.get("status"),
    }
}
