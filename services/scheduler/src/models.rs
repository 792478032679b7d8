//! API models for request and response payloads

use common::error::SchedulingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod availability;
pub mod meeting;

/// Platform roles a meeting party can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Counselor,
    Company,
    Admin,
}

impl UserRole {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Counselor => "counselor",
            UserRole::Company => "company",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(UserRole::Student),
            "counselor" => Ok(UserRole::Counselor),
            "company" => Ok(UserRole::Company),
            "admin" => Ok(UserRole::Admin),
            other => Err(SchedulingError::Internal(format!(
                "unknown user role: {other}"
            ))),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [
            UserRole::Student,
            UserRole::Counselor,
            UserRole::Company,
            UserRole::Admin,
        ] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("recruiter".parse::<UserRole>().is_err());
    }
}
