//! Error types shared across the scheduling services
//!
//! `DatabaseError` covers infrastructure failures; `SchedulingError` is
//! the domain taxonomy every store and lifecycle operation returns.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Domain error taxonomy for availability and meeting operations.
///
/// `Conflict` is an expected, retryable condition (a concurrent caller
/// got the slot first); callers are expected to re-fetch slots and try
/// again. Everything else is a hard failure for the request at hand.
#[derive(Error, Debug)]
pub enum SchedulingError {
    /// Malformed input, rejected before any persistence attempt
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced record does not exist or does not belong to the actor
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Acting user is not a legitimate party to the operation
    #[error("not permitted: {0}")]
    Authorization(String),

    /// Transition attempted from a state that does not permit it
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The requested slot is no longer free; retryable
    #[error("slot conflict: {0}")]
    Conflict(String),

    /// Stored data could not be interpreted
    #[error("internal error: {0}")]
    Internal(String),

    /// Infrastructure failure
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<SqlxError> for SchedulingError {
    /// Maps constraint violations raised by the booking exclusion
    /// constraints (SQLSTATE 23P01) and uniqueness checks (23505) to
    /// `Conflict`; everything else is an infrastructure failure.
    fn from(err: SqlxError) -> Self {
        if let SqlxError::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                if code == "23P01" || code == "23505" {
                    return SchedulingError::Conflict(
                        "an overlapping booking already exists".to_string(),
                    );
                }
            }
        }

        SchedulingError::Database(DatabaseError::Query(err))
    }
}

/// Type alias for Result with SchedulingError
pub type SchedulingResult<T> = Result<T, SchedulingError>;
