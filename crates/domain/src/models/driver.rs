//! Driver domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use super::vehicle::VehicleClass;

/// Availability state of a driver.
///
/// `busy` means the driver holds exactly one pending offer; `on_trip`
/// means exactly one non-terminal trip is bound to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Offline,
    Available,
    Busy,
    OnTrip,
}

impl DriverStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Offline => "offline",
            DriverStatus::Available => "available",
            DriverStatus::Busy => "busy",
            DriverStatus::OnTrip => "on_trip",
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DriverStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offline" => Ok(DriverStatus::Offline),
            "available" => Ok(DriverStatus::Available),
            "busy" => Ok(DriverStatus::Busy),
            "on_trip" => Ok(DriverStatus::OnTrip),
            _ => Err(format!(
                "Invalid driver status: {s}. Must be one of: offline, available, busy, on_trip"
            )),
        }
    }
}

/// Request payload for a driver location heartbeat.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DriverLocationUpdate {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub lat: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub lng: f64,
}

/// Request payload for accepting or declining a ride offer.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverAcceptRequest {
    pub ride_id: Uuid,
    pub accept: bool,
}

/// Response payload for driver retrieval.
#[derive(Debug, Clone, Serialize)]
pub struct DriverResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub vehicle_type: VehicleClass,
    pub status: DriverStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_lng: Option<f64>,
    pub rating: Decimal,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_status_round_trip() {
        for s in [
            DriverStatus::Offline,
            DriverStatus::Available,
            DriverStatus::Busy,
            DriverStatus::OnTrip,
        ] {
            assert_eq!(s.as_str().parse::<DriverStatus>().unwrap(), s);
        }
    }

    #[test]
    fn test_driver_status_serde() {
        assert_eq!(serde_json::to_string(&DriverStatus::OnTrip).unwrap(), "\"on_trip\"");
        let parsed: DriverStatus = serde_json::from_str("\"busy\"").unwrap();
        assert_eq!(parsed, DriverStatus::Busy);
    }

    #[test]
    fn test_location_update_validation() {
        let ok = DriverLocationUpdate { lat: 12.9716, lng: 77.5946 };
        assert!(ok.validate().is_ok());

        let bad = DriverLocationUpdate { lat: 95.0, lng: 77.5946 };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_accept_request_deserialization() {
        let json = r#"{"ride_id": "550e8400-e29b-41d4-a716-446655440000", "accept": false}"#;
        let request: DriverAcceptRequest = serde_json::from_str(json).unwrap();
        assert!(!request.accept);
    }
}
