//! Dispatch error taxonomy.
//!
//! Core services raise these typed errors; the HTTP boundary maps each
//! variant to a status code without translating one kind into another.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Ride not found: {0}")]
    RideNotFound(Uuid),

    #[error("Driver not found: {0}")]
    DriverNotFound(Uuid),

    #[error("Trip not found: {0}")]
    TripNotFound(Uuid),

    #[error("Invalid state transition from '{from}' to '{to}'")]
    InvalidStateTransition { from: String, to: String },

    #[error("Driver unavailable: {0}")]
    DriverUnavailable(String),

    #[error("Duplicate request: {0}")]
    DuplicateRequest(String),

    #[error("Payment failed: {0}")]
    Payment(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl DispatchError {
    /// Build an `InvalidStateTransition` from any displayable state pair.
    pub fn invalid_transition(from: impl fmt::Display, to: impl fmt::Display) -> Self {
        DispatchError::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message() {
        let err = DispatchError::invalid_transition("in_trip", "cancelled");
        assert_eq!(
            err.to_string(),
            "Invalid state transition from 'in_trip' to 'cancelled'"
        );
    }

    #[test]
    fn test_not_found_messages_carry_id() {
        let id = Uuid::new_v4();
        assert!(DispatchError::RideNotFound(id).to_string().contains(&id.to_string()));
        assert!(DispatchError::TripNotFound(id).to_string().contains(&id.to_string()));
    }
}
