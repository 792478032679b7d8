//! Meeting lifecycle manager
//!
//! State machine over `requested -> accepted -> completed`, with
//! `declined` and `cancelled` as the other terminal states. Every
//! transition runs as a single transaction: load the meeting with a row
//! lock, apply the pure guard checks, mutate, commit. Conflict
//! re-checks at `request` and `accept` are mandatory; "slot no longer
//! free" is an expected, retryable condition surfaced as `Conflict`,
//! with the hold table's exclusion constraint closing the remaining
//! race window.

use chrono::{NaiveDateTime, Utc};
use common::civil::TimeRange;
use common::error::{SchedulingError, SchedulingResult};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::meeting::{
    CreateMeetingRequest, Meeting, MeetingRating, MeetingStatus, MeetingType,
};
use crate::notifier::{LifecycleEvent, Notifier};
use crate::repositories::{self, meeting};
use crate::resolver;

/// Drives meeting state transitions against the store
#[derive(Clone)]
pub struct LifecycleManager {
    pool: PgPool,
    notifier: Notifier,
}

impl LifecycleManager {
    /// Create a new lifecycle manager
    pub fn new(pool: PgPool, notifier: Notifier) -> Self {
        Self { pool, notifier }
    }

    /// Book a meeting against a free slot. Validates the payload,
    /// confirms the slot is inside the recipient's availability and
    /// free of overlapping non-terminal meetings for both parties, and
    /// creates the meeting in `requested` state.
    pub async fn request(
        &self,
        requestor_id: Uuid,
        payload: &CreateMeetingRequest,
    ) -> SchedulingResult<Meeting> {
        let range = guards::validate_request(requestor_id, payload, now())?;

        let mut tx = self.pool.begin().await.map_err(SchedulingError::from)?;

        let recipient_role = repositories::role_of(&mut tx, payload.recipient_id)
            .await?
            .ok_or(SchedulingError::NotFound("recipient"))?;
        let requestor_role = repositories::role_of(&mut tx, requestor_id)
            .await?
            .ok_or(SchedulingError::NotFound("requestor"))?;

        match MeetingType::for_roles(requestor_role, recipient_role) {
            Some(expected) if expected == payload.meeting_type => {}
            _ => {
                return Err(SchedulingError::Validation(
                    "meeting type does not match the participants' roles".to_string(),
                ));
            }
        }

        if meeting::has_overlapping_meeting(&mut tx, requestor_id, payload.meeting_date, range, None)
            .await?
        {
            return Err(SchedulingError::Conflict(
                "requestor already has a meeting in that window".to_string(),
            ));
        }

        if !resolver::range_is_free(&mut tx, payload.recipient_id, payload.meeting_date, range)
            .await?
        {
            return Err(SchedulingError::Conflict(
                "slot is not available for the recipient".to_string(),
            ));
        }

        let created = meeting::insert_requested(
            &mut tx,
            requestor_id,
            payload.recipient_id,
            payload.title.trim(),
            &payload.description,
            payload.meeting_date,
            range,
            payload.meeting_type.as_str(),
        )
        .await?;

        tx.commit().await.map_err(SchedulingError::from)?;

        info!(meeting_id = %created.id, "meeting requested");
        self.notifier
            .emit(LifecycleEvent::MeetingRequested, &created)
            .await;

        Ok(created)
    }

    /// Accept a requested meeting. Only the recipient may accept; the
    /// overlap re-check covers anything that changed for either party
    /// since the request was made.
    pub async fn accept(&self, meeting_id: Uuid, acting_user: Uuid) -> SchedulingResult<Meeting> {
        let mut tx = self.pool.begin().await.map_err(SchedulingError::from)?;

        let found = meeting::fetch_for_update(&mut tx, meeting_id)
            .await?
            .ok_or(SchedulingError::NotFound("meeting"))?;

        guards::ensure_recipient(&found, acting_user, "accept")?;
        guards::ensure_status(found.status, MeetingStatus::Requested, "accept")?;

        for party in [found.requestor_id, found.recipient_id] {
            if meeting::has_overlapping_meeting(
                &mut tx,
                party,
                found.meeting_date,
                found.time_range(),
                Some(found.id),
            )
            .await?
            {
                return Err(SchedulingError::Conflict(
                    "an overlapping meeting was booked since this request was made".to_string(),
                ));
            }
        }

        meeting::set_status(&mut tx, meeting_id, MeetingStatus::Accepted, None).await?;
        tx.commit().await.map_err(SchedulingError::from)?;

        let updated = Meeting {
            status: MeetingStatus::Accepted,
            ..found
        };

        info!(meeting_id = %meeting_id, "meeting accepted");
        self.notifier
            .emit(LifecycleEvent::MeetingAccepted, &updated)
            .await;

        Ok(updated)
    }

    /// Decline a requested meeting, storing the recipient's reason
    pub async fn decline(
        &self,
        meeting_id: Uuid,
        acting_user: Uuid,
        reason: &str,
    ) -> SchedulingResult<Meeting> {
        let mut tx = self.pool.begin().await.map_err(SchedulingError::from)?;

        let found = meeting::fetch_for_update(&mut tx, meeting_id)
            .await?
            .ok_or(SchedulingError::NotFound("meeting"))?;

        guards::ensure_recipient(&found, acting_user, "decline")?;
        guards::ensure_status(found.status, MeetingStatus::Requested, "decline")?;

        meeting::set_status(&mut tx, meeting_id, MeetingStatus::Declined, Some(reason)).await?;
        meeting::release_holds(&mut tx, meeting_id).await?;
        tx.commit().await.map_err(SchedulingError::from)?;

        let updated = Meeting {
            status: MeetingStatus::Declined,
            decline_reason: Some(reason.to_string()),
            ..found
        };

        info!(meeting_id = %meeting_id, "meeting declined");
        self.notifier
            .emit(LifecycleEvent::MeetingDeclined, &updated)
            .await;

        Ok(updated)
    }

    /// Cancel a non-terminal meeting before it begins; either party may
    /// cancel
    pub async fn cancel(&self, meeting_id: Uuid, acting_user: Uuid) -> SchedulingResult<Meeting> {
        let mut tx = self.pool.begin().await.map_err(SchedulingError::from)?;

        let found = meeting::fetch_for_update(&mut tx, meeting_id)
            .await?
            .ok_or(SchedulingError::NotFound("meeting"))?;

        guards::ensure_cancellable(&found, acting_user, now())?;

        meeting::set_status(&mut tx, meeting_id, MeetingStatus::Cancelled, None).await?;
        meeting::release_holds(&mut tx, meeting_id).await?;
        tx.commit().await.map_err(SchedulingError::from)?;

        let updated = Meeting {
            status: MeetingStatus::Cancelled,
            ..found
        };

        info!(meeting_id = %meeting_id, "meeting cancelled");
        self.notifier
            .emit(LifecycleEvent::MeetingCancelled, &updated)
            .await;

        Ok(updated)
    }

    /// Store one party's post-meeting rating. An elapsed `accepted`
    /// meeting is lazily flipped to `completed` here, so a rating does
    /// not have to wait for the periodic sweep.
    pub async fn rate(
        &self,
        meeting_id: Uuid,
        acting_user: Uuid,
        rating: MeetingRating,
    ) -> SchedulingResult<Meeting> {
        guards::validate_rating(rating)?;

        let mut tx = self.pool.begin().await.map_err(SchedulingError::from)?;

        let mut found = meeting::fetch_for_update(&mut tx, meeting_id)
            .await?
            .ok_or(SchedulingError::NotFound("meeting"))?;

        if found.status == MeetingStatus::Accepted && found.ends_at() < now() {
            meeting::set_status(&mut tx, meeting_id, MeetingStatus::Completed, None).await?;
            meeting::release_holds(&mut tx, meeting_id).await?;
            found.status = MeetingStatus::Completed;
        }

        guards::ensure_party(&found, acting_user, "rate")?;
        guards::ensure_status(found.status, MeetingStatus::Completed, "rate")?;

        let as_requestor = found.requestor_id == acting_user;
        meeting::set_rating(&mut tx, meeting_id, as_requestor, rating).await?;
        tx.commit().await.map_err(SchedulingError::from)?;

        if as_requestor {
            found.requestor_rating = Some(rating);
        } else {
            found.recipient_rating = Some(rating);
        }

        info!(meeting_id = %meeting_id, "meeting rated");
        Ok(found)
    }
}

/// Current civil instant; the platform runs in a single timezone and
/// deployments pin both the application clock and the database session
/// to it.
fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Pure transition guards, separated from persistence so the state
/// machine rules are testable without a database.
pub(crate) mod guards {
    use super::{
        CreateMeetingRequest, Meeting, MeetingRating, MeetingStatus, NaiveDateTime,
        SchedulingError, SchedulingResult, TimeRange, Uuid,
    };

    /// Validate a booking payload, returning its time range
    pub fn validate_request(
        requestor_id: Uuid,
        payload: &CreateMeetingRequest,
        now: NaiveDateTime,
    ) -> SchedulingResult<TimeRange> {
        if requestor_id == payload.recipient_id {
            return Err(SchedulingError::Validation(
                "requestor and recipient must differ".to_string(),
            ));
        }

        if payload.title.trim().is_empty() {
            return Err(SchedulingError::Validation(
                "title must not be empty".to_string(),
            ));
        }

        let range = TimeRange::new(payload.start_time, payload.end_time).ok_or_else(|| {
            SchedulingError::Validation("start time must be before end time".to_string())
        })?;

        if payload.meeting_date.and_time(payload.start_time) <= now {
            return Err(SchedulingError::Validation(
                "meeting must be scheduled in the future".to_string(),
            ));
        }

        Ok(range)
    }

    /// The actor must be one of the meeting's two parties
    pub fn ensure_party(
        meeting: &Meeting,
        acting_user: Uuid,
        action: &str,
    ) -> SchedulingResult<()> {
        if !meeting.is_party(acting_user) {
            return Err(SchedulingError::Authorization(format!(
                "only a meeting party may {action}"
            )));
        }

        Ok(())
    }

    /// The actor must be the meeting's recipient
    pub fn ensure_recipient(
        meeting: &Meeting,
        acting_user: Uuid,
        action: &str,
    ) -> SchedulingResult<()> {
        if meeting.recipient_id != acting_user {
            return Err(SchedulingError::Authorization(format!(
                "only the recipient may {action} a meeting"
            )));
        }

        Ok(())
    }

    /// The meeting must currently be in `expected`
    pub fn ensure_status(
        current: MeetingStatus,
        expected: MeetingStatus,
        action: &str,
    ) -> SchedulingResult<()> {
        if current != expected {
            return Err(SchedulingError::InvalidState(format!(
                "cannot {action} a meeting in state {}",
                current.as_str()
            )));
        }

        Ok(())
    }

    /// Cancellation: either party, non-terminal state, and the meeting
    /// has not yet begun
    pub fn ensure_cancellable(
        meeting: &Meeting,
        acting_user: Uuid,
        now: NaiveDateTime,
    ) -> SchedulingResult<()> {
        ensure_party(meeting, acting_user, "cancel")?;

        if meeting.status.is_terminal() {
            return Err(SchedulingError::InvalidState(format!(
                "cannot cancel a meeting in state {}",
                meeting.status.as_str()
            )));
        }

        if meeting.starts_at() <= now {
            return Err(SchedulingError::InvalidState(
                "cannot cancel a meeting that has already started".to_string(),
            ));
        }

        Ok(())
    }

    /// Ratings are 1-5 on both scales
    pub fn validate_rating(rating: MeetingRating) -> SchedulingResult<()> {
        for value in [rating.success, rating.platform] {
            if !(1..=5).contains(&value) {
                return Err(SchedulingError::Validation(
                    "ratings must be between 1 and 5".to_string(),
                ));
            }
        }

        Ok(())
    }
}
