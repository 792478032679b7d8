//! Meeting snapshots carried by sweeper-emitted events

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

/// The slice of a meeting the notification service needs
#[derive(Debug, Clone, Serialize)]
pub struct MeetingSnapshot {
    pub id: Uuid,
    pub requestor_id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub meeting_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub meeting_type: String,
    pub status: String,
}
