//! Meeting models for the scheduling service

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use common::civil::TimeRange;
use common::error::SchedulingError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::UserRole;

/// Meeting lifecycle states. `Requested` is initial; `Declined`,
/// `Cancelled`, and `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Requested,
    Accepted,
    Declined,
    Cancelled,
    Completed,
}

impl MeetingStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Requested => "requested",
            MeetingStatus::Accepted => "accepted",
            MeetingStatus::Declined => "declined",
            MeetingStatus::Cancelled => "cancelled",
            MeetingStatus::Completed => "completed",
        }
    }

    /// Terminal states can never transition again
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MeetingStatus::Declined | MeetingStatus::Cancelled | MeetingStatus::Completed
        )
    }
}

impl FromStr for MeetingStatus {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(MeetingStatus::Requested),
            "accepted" => Ok(MeetingStatus::Accepted),
            "declined" => Ok(MeetingStatus::Declined),
            "cancelled" => Ok(MeetingStatus::Cancelled),
            "completed" => Ok(MeetingStatus::Completed),
            other => Err(SchedulingError::Internal(format!(
                "unknown meeting status: {other}"
            ))),
        }
    }
}

/// Closed set of role pairs a meeting can connect. Validated at the
/// boundary so free-form pair strings never reach storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingType {
    StudentCompany,
    StudentCounselor,
    CounselorCompany,
}

impl MeetingType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingType::StudentCompany => "student_company",
            MeetingType::StudentCounselor => "student_counselor",
            MeetingType::CounselorCompany => "counselor_company",
        }
    }

    /// The meeting type connecting two roles, in either order.
    /// `None` when the pair cannot meet (same role, or an admin).
    #[must_use]
    pub fn for_roles(a: UserRole, b: UserRole) -> Option<MeetingType> {
        use UserRole::{Company, Counselor, Student};
        match (a, b) {
            (Student, Company) | (Company, Student) => Some(MeetingType::StudentCompany),
            (Student, Counselor) | (Counselor, Student) => Some(MeetingType::StudentCounselor),
            (Counselor, Company) | (Company, Counselor) => Some(MeetingType::CounselorCompany),
            _ => None,
        }
    }
}

impl FromStr for MeetingType {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student_company" => Ok(MeetingType::StudentCompany),
            "student_counselor" => Ok(MeetingType::StudentCounselor),
            "counselor_company" => Ok(MeetingType::CounselorCompany),
            other => Err(SchedulingError::Validation(format!(
                "unknown meeting type: {other}"
            ))),
        }
    }
}

/// One party's post-meeting rating pair, each on a 1-5 scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MeetingRating {
    pub success: i16,
    pub platform: i16,
}

/// A single scheduled meeting occurrence between two users
#[derive(Debug, Clone, Serialize)]
pub struct Meeting {
    pub id: Uuid,
    pub requestor_id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub description: String,
    pub meeting_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub meeting_type: MeetingType,
    pub status: MeetingStatus,
    pub decline_reason: Option<String>,
    pub requestor_rating: Option<MeetingRating>,
    pub recipient_rating: Option<MeetingRating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    /// Whether `user_id` is one of the two parties
    #[must_use]
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.requestor_id == user_id || self.recipient_id == user_id
    }

    /// The meeting's wall-clock time range within its date
    #[must_use]
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// The civil instant at which the meeting begins
    #[must_use]
    pub fn starts_at(&self) -> NaiveDateTime {
        self.meeting_date.and_time(self.start_time)
    }

    /// The civil instant at which the meeting ends
    #[must_use]
    pub fn ends_at(&self) -> NaiveDateTime {
        self.meeting_date.and_time(self.end_time)
    }
}

/// Request to book a meeting against a free slot
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMeetingRequest {
    pub recipient_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub meeting_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub meeting_type: MeetingType,
}

/// Request body for declining a meeting
#[derive(Debug, Clone, Deserialize)]
pub struct DeclineRequest {
    pub reason: String,
}

/// Request body for submitting a post-meeting rating
#[derive(Debug, Clone, Deserialize)]
pub struct RatingRequest {
    pub success_rating: i16,
    pub platform_rating: i16,
}
