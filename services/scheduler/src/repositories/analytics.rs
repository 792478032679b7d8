//! Read-only analytics rollups over historical meeting records

use chrono::NaiveDate;
use common::civil;
use common::error::SchedulingResult;
use serde::Serialize;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;

/// Meetings counted for one lifecycle status
#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Completed meetings counted for one starting hour of the day
#[derive(Debug, Clone, Serialize)]
pub struct HourCount {
    pub hour: i32,
    pub count: i64,
}

/// Completed meetings counted for one day of the week (0 = Sunday)
#[derive(Debug, Clone, Serialize)]
pub struct WeekdayCount {
    pub day_of_week: u8,
    pub count: i64,
}

/// Aggregate view served by the analytics endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MeetingAnalytics {
    pub total_meetings: i64,
    pub by_status: Vec<StatusCount>,
    pub busiest_hours: Vec<HourCount>,
    pub busiest_days: Vec<WeekdayCount>,
    pub average_success_rating: Option<f64>,
    pub average_platform_rating: Option<f64>,
}

/// Analytics repository for read-only rollup queries
#[derive(Clone)]
pub struct AnalyticsRepository {
    pool: PgPool,
}

impl AnalyticsRepository {
    /// Create a new analytics repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Compute the full rollup. Uncached; the result set is small.
    pub async fn meeting_analytics(&self) -> SchedulingResult<MeetingAnalytics> {
        let by_status = self.counts_by_status().await?;
        let total_meetings = by_status.iter().map(|s| s.count).sum();

        Ok(MeetingAnalytics {
            total_meetings,
            by_status,
            busiest_hours: self.busiest_hours().await?,
            busiest_days: self.busiest_days().await?,
            average_success_rating: self.average_rating("success").await?,
            average_platform_rating: self.average_rating("platform").await?,
        })
    }

    async fn counts_by_status(&self) -> SchedulingResult<Vec<StatusCount>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM meetings GROUP BY status ORDER BY count DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| StatusCount {
                status: row.get("status"),
                count: row.get("count"),
            })
            .collect())
    }

    async fn busiest_hours(&self) -> SchedulingResult<Vec<HourCount>> {
        let rows = sqlx::query(
            r#"
            SELECT EXTRACT(HOUR FROM start_time)::INT AS hour, COUNT(*) AS count
            FROM meetings
            WHERE status = 'completed'
            GROUP BY hour
            ORDER BY count DESC, hour
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| HourCount {
                hour: row.get("hour"),
                count: row.get("count"),
            })
            .collect())
    }

    /// Weekday rollup. Dates are grouped in SQL but mapped to weekdays
    /// through the canonical `civil::day_of_week`, not a second SQL
    /// calculation.
    async fn busiest_days(&self) -> SchedulingResult<Vec<WeekdayCount>> {
        let rows = sqlx::query(
            r#"
            SELECT meeting_date, COUNT(*) AS count
            FROM meetings
            WHERE status = 'completed'
            GROUP BY meeting_date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut per_weekday: BTreeMap<u8, i64> = BTreeMap::new();
        for row in &rows {
            let date: NaiveDate = row.get("meeting_date");
            let count: i64 = row.get("count");
            *per_weekday.entry(civil::day_of_week(date)).or_insert(0) += count;
        }

        let mut days: Vec<WeekdayCount> = per_weekday
            .into_iter()
            .map(|(day_of_week, count)| WeekdayCount { day_of_week, count })
            .collect();
        days.sort_by(|a, b| b.count.cmp(&a.count).then(a.day_of_week.cmp(&b.day_of_week)));

        Ok(days)
    }

    async fn average_rating(&self, kind: &str) -> SchedulingResult<Option<f64>> {
        let query = if kind == "success" {
            r#"
            SELECT AVG(v)::FLOAT8 AS average FROM (
                SELECT requestor_success_rating AS v FROM meetings
                WHERE requestor_success_rating IS NOT NULL
                UNION ALL
                SELECT recipient_success_rating FROM meetings
                WHERE recipient_success_rating IS NOT NULL
            ) ratings
            "#
        } else {
            r#"
            SELECT AVG(v)::FLOAT8 AS average FROM (
                SELECT requestor_platform_rating AS v FROM meetings
                WHERE requestor_platform_rating IS NOT NULL
                UNION ALL
                SELECT recipient_platform_rating FROM meetings
                WHERE recipient_platform_rating IS NOT NULL
            ) ratings
            "#
        };

        let row = sqlx::query(query).fetch_one(&self.pool).await?;
        Ok(row.get("average"))
    }
}
