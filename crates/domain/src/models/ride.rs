//! Ride request and ride offer domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use super::payment::PaymentMethod;
use super::vehicle::VehicleClass;
use crate::error::DispatchError;

// ============================================================================
// Ride Status State Machine
// ============================================================================

/// Lifecycle state of a ride request.
///
/// `pending -> matching -> offered -> accepted -> driver_en_route ->
/// arrived -> in_trip -> completed`, with re-matching
/// (`offered -> matching`), exhaustion (`offered -> no_drivers`) and
/// cancellation from every pre-trip state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Matching,
    Offered,
    Accepted,
    DriverEnRoute,
    Arrived,
    InTrip,
    Completed,
    Cancelled,
    NoDrivers,
}

impl RideStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Matching => "matching",
            RideStatus::Offered => "offered",
            RideStatus::Accepted => "accepted",
            RideStatus::DriverEnRoute => "driver_en_route",
            RideStatus::Arrived => "arrived",
            RideStatus::InTrip => "in_trip",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
            RideStatus::NoDrivers => "no_drivers",
        }
    }

    /// Check if transition to target state is valid.
    pub fn can_transition_to(&self, target: RideStatus) -> bool {
        use RideStatus::*;
        match (self, target) {
            (Pending, Matching) | (Pending, Cancelled) => true,
            (Matching, Offered) | (Matching, Cancelled) => true,
            (Offered, Accepted) | (Offered, Matching) | (Offered, NoDrivers) | (Offered, Cancelled) => true,
            (Accepted, DriverEnRoute) | (Accepted, Cancelled) => true,
            (DriverEnRoute, Arrived) | (DriverEnRoute, Cancelled) => true,
            (Arrived, InTrip) | (Arrived, Cancelled) => true,
            (InTrip, Completed) => true,
            _ => false,
        }
    }

    /// Validate and execute a transition, returning the new status.
    pub fn transition(self, target: RideStatus) -> Result<RideStatus, DispatchError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(DispatchError::invalid_transition(self, target))
        }
    }

    /// Terminal states have no outgoing edges.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled | RideStatus::NoDrivers)
    }

    /// States from which a rider may still cancel.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            RideStatus::Pending
                | RideStatus::Matching
                | RideStatus::Offered
                | RideStatus::Accepted
                | RideStatus::DriverEnRoute
                | RideStatus::Arrived
        )
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RideStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RideStatus::Pending),
            "matching" => Ok(RideStatus::Matching),
            "offered" => Ok(RideStatus::Offered),
            "accepted" => Ok(RideStatus::Accepted),
            "driver_en_route" => Ok(RideStatus::DriverEnRoute),
            "arrived" => Ok(RideStatus::Arrived),
            "in_trip" => Ok(RideStatus::InTrip),
            "completed" => Ok(RideStatus::Completed),
            "cancelled" => Ok(RideStatus::Cancelled),
            "no_drivers" => Ok(RideStatus::NoDrivers),
            _ => Err(format!("Invalid ride status: {s}")),
        }
    }
}

// ============================================================================
// Offer Status State Machine
// ============================================================================

/// Lifecycle state of a ride offer. Every non-pending state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl OfferStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Declined => "declined",
            OfferStatus::Expired => "expired",
        }
    }

    /// Check if transition to target state is valid.
    pub fn can_transition_to(&self, target: OfferStatus) -> bool {
        matches!(self, OfferStatus::Pending) && !matches!(target, OfferStatus::Pending)
    }

    /// Validate and execute a transition, returning the new status.
    pub fn transition(self, target: OfferStatus) -> Result<OfferStatus, DispatchError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(DispatchError::invalid_transition(self, target))
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OfferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OfferStatus::Pending),
            "accepted" => Ok(OfferStatus::Accepted),
            "declined" => Ok(OfferStatus::Declined),
            "expired" => Ok(OfferStatus::Expired),
            _ => Err(format!("Invalid offer status: {s}")),
        }
    }
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Request payload for creating a ride.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRideRequest {
    pub rider_id: Uuid,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub pickup_lat: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub pickup_lng: f64,

    #[validate(length(max = 500, message = "pickup_address must be at most 500 characters"))]
    pub pickup_address: Option<String>,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub dest_lat: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub dest_lng: f64,

    #[validate(length(max = 500, message = "dest_address must be at most 500 characters"))]
    pub dest_address: Option<String>,

    pub vehicle_type: VehicleClass,

    #[serde(default)]
    pub payment_method: PaymentMethod,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Response payload for ride retrieval. Also the shape cached as the
/// `ride:{id}` snapshot, so it round-trips through serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideResponse {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub status: RideStatus,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub pickup_address: Option<String>,
    pub dest_lat: f64,
    pub dest_lng: f64,
    pub dest_address: Option<String>,
    pub vehicle_type: VehicleClass,
    pub payment_method: PaymentMethod,
    pub surge_multiplier: Decimal,
    pub estimated_fare: Option<Decimal>,
    pub matched_driver_id: Option<Uuid>,
    pub offers_made: i32,
    pub max_offers: i32,
    pub created_at: DateTime<Utc>,
}

/// Response payload for a ride offer.
#[derive(Debug, Clone, Serialize)]
pub struct RideOfferResponse {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub status: OfferStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_RIDE_STATES: [RideStatus; 10] = [
        RideStatus::Pending,
        RideStatus::Matching,
        RideStatus::Offered,
        RideStatus::Accepted,
        RideStatus::DriverEnRoute,
        RideStatus::Arrived,
        RideStatus::InTrip,
        RideStatus::Completed,
        RideStatus::Cancelled,
        RideStatus::NoDrivers,
    ];

    #[test]
    fn test_ride_status_round_trip() {
        for s in ALL_RIDE_STATES {
            assert_eq!(s.as_str().parse::<RideStatus>().unwrap(), s);
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            RideStatus::Pending,
            RideStatus::Matching,
            RideStatus::Offered,
            RideStatus::Accepted,
            RideStatus::DriverEnRoute,
            RideStatus::Arrived,
            RideStatus::InTrip,
            RideStatus::Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_rematch_and_exhaustion_edges() {
        assert!(RideStatus::Offered.can_transition_to(RideStatus::Matching));
        assert!(RideStatus::Offered.can_transition_to(RideStatus::NoDrivers));
        assert!(!RideStatus::Matching.can_transition_to(RideStatus::Accepted));
    }

    #[test]
    fn test_cancellation_edges() {
        for s in ALL_RIDE_STATES {
            assert_eq!(s.can_transition_to(RideStatus::Cancelled), s.is_cancellable());
        }
        assert!(!RideStatus::InTrip.can_transition_to(RideStatus::Cancelled));
    }

    #[test]
    fn test_terminal_states_have_no_outgoing_edges() {
        for s in ALL_RIDE_STATES.into_iter().filter(RideStatus::is_terminal) {
            for t in ALL_RIDE_STATES {
                assert!(!s.can_transition_to(t), "{s} -> {t} should be invalid");
            }
        }
    }

    #[test]
    fn test_transition_matches_can_transition() {
        for s in ALL_RIDE_STATES {
            for t in ALL_RIDE_STATES {
                assert_eq!(s.transition(t).is_ok(), s.can_transition_to(t));
            }
        }
    }

    #[test]
    fn test_transition_error_names_states() {
        let err = RideStatus::Completed.transition(RideStatus::Matching).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid state transition from 'completed' to 'matching'"
        );
    }

    #[test]
    fn test_offer_transitions() {
        assert!(OfferStatus::Pending.can_transition_to(OfferStatus::Accepted));
        assert!(OfferStatus::Pending.can_transition_to(OfferStatus::Declined));
        assert!(OfferStatus::Pending.can_transition_to(OfferStatus::Expired));
        assert!(!OfferStatus::Pending.can_transition_to(OfferStatus::Pending));
        assert!(!OfferStatus::Accepted.can_transition_to(OfferStatus::Expired));
        assert!(!OfferStatus::Declined.can_transition_to(OfferStatus::Accepted));
        assert!(!OfferStatus::Expired.can_transition_to(OfferStatus::Pending));
    }

    #[test]
    fn test_ride_status_serde() {
        assert_eq!(
            serde_json::to_string(&RideStatus::DriverEnRoute).unwrap(),
            "\"driver_en_route\""
        );
        let parsed: RideStatus = serde_json::from_str("\"no_drivers\"").unwrap();
        assert_eq!(parsed, RideStatus::NoDrivers);
    }

    #[test]
    fn test_create_ride_request_defaults_payment_to_cash() {
        let json = r#"{
            "rider_id": "550e8400-e29b-41d4-a716-446655440000",
            "pickup_lat": 12.9716,
            "pickup_lng": 77.5946,
            "dest_lat": 12.9352,
            "dest_lng": 77.6245,
            "vehicle_type": "mini"
        }"#;
        let request: CreateRideRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.payment_method, PaymentMethod::Cash);
        assert_eq!(request.vehicle_type, VehicleClass::Mini);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_ride_request_rejects_bad_coordinates() {
        let request = CreateRideRequest {
            rider_id: Uuid::new_v4(),
            pickup_lat: 91.0,
            pickup_lng: 77.5946,
            pickup_address: None,
            dest_lat: 12.9352,
            dest_lng: 77.6245,
            dest_address: None,
            vehicle_type: VehicleClass::Mini,
            payment_method: PaymentMethod::Cash,
        };
        assert!(request.validate().is_err());
    }
}
