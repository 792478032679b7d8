//! Meeting sweeper service
//!
//! Periodic maintenance over the meetings table: flips elapsed
//! `accepted` meetings to `completed` and emits reminders for meetings
//! starting soon. Both passes are idempotent; the job holds no state
//! beyond an explicit database handle.

pub mod database;
pub mod models;
pub mod sweep;
