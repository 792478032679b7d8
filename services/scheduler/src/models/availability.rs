//! Availability models for the scheduling service

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use common::civil::TimeRange;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A declared availability window, either recurring by weekday
/// (0 = Sunday) or one-off for a specific date. Exactly one of
/// `day_of_week` and `on_date` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub day_of_week: Option<i16>,
    pub on_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

/// Request to create an availability rule
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRuleRequest {
    pub day_of_week: Option<i16>,
    pub on_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// An absolute span during which the owner is unavailable, overriding
/// any availability rule it overlaps. May cross day boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailabilityBlock {
    pub id: Uuid,
    pub user_id: Uuid,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub created_at: DateTime<Utc>,
}

/// Request to create an unavailability block
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBlockRequest {
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
}

/// A bookable slot returned by the conflict resolver
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Slot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl From<TimeRange> for Slot {
    fn from(range: TimeRange) -> Self {
        Self {
            start_time: range.start,
            end_time: range.end,
        }
    }
}

/// Query parameters for slot listing
#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    /// Civil date, YYYY-MM-DD
    pub date: NaiveDate,
    /// Slot length in minutes; defaults to 30
    pub granularity: Option<u32>,
}
