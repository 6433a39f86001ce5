//! Trip domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::error::DispatchError;

/// Lifecycle state of a trip.
///
/// Trips are created directly as `in_progress`; the `started ->
/// in_progress` edge stays available for external writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Started,
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

impl TripStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Started => "started",
            TripStatus::InProgress => "in_progress",
            TripStatus::Paused => "paused",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }

    /// Check if transition to target state is valid.
    pub fn can_transition_to(&self, target: TripStatus) -> bool {
        use TripStatus::*;
        match (self, target) {
            (Started, InProgress) | (Started, Cancelled) => true,
            (InProgress, Completed) | (InProgress, Paused) | (InProgress, Cancelled) => true,
            (Paused, InProgress) | (Paused, Cancelled) => true,
            _ => false,
        }
    }

    /// Validate and execute a transition, returning the new status.
    pub fn transition(self, target: TripStatus) -> Result<TripStatus, DispatchError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(DispatchError::invalid_transition(self, target))
        }
    }

    /// States from which the trip can still be ended.
    pub fn is_endable(&self) -> bool {
        matches!(self, TripStatus::Started | TripStatus::InProgress | TripStatus::Paused)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TripStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(TripStatus::Started),
            "in_progress" => Ok(TripStatus::InProgress),
            "paused" => Ok(TripStatus::Paused),
            "completed" => Ok(TripStatus::Completed),
            "cancelled" => Ok(TripStatus::Cancelled),
            _ => Err(format!("Invalid trip status: {s}")),
        }
    }
}

/// Request payload for ending a trip with measured telemetry.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TripEndRequest {
    #[validate(range(min = 0, message = "distance_m must be non-negative"))]
    pub distance_m: i64,

    #[validate(range(min = 0, message = "duration_s must be non-negative"))]
    pub duration_s: i64,
}

/// Response payload for trip retrieval.
#[derive(Debug, Clone, Serialize)]
pub struct TripResponse {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub rider_id: Uuid,
    pub status: TripStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub distance_m: i64,
    pub duration_s: i64,
    pub base_fare: Decimal,
    pub distance_fare: Decimal,
    pub time_fare: Decimal,
    pub surge_multiplier: Decimal,
    pub total_fare: Decimal,
    pub created_at: DateTime<Utc>,
}
