//! Ride endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::OptionalIdempotencyKey;
use crate::services::RideService;
use domain::models::{CreateRideRequest, RideResponse};

/// POST /v1/rides
pub async fn create_ride(
    State(state): State<AppState>,
    OptionalIdempotencyKey(idempotency_key): OptionalIdempotencyKey,
    Json(request): Json<CreateRideRequest>,
) -> Result<(StatusCode, Json<RideResponse>), ApiError> {
    request.validate()?;

    let service = RideService::from_state(&state);
    let ride = service.create_ride(request, idempotency_key).await?;
    Ok((StatusCode::CREATED, Json(ride)))
}

/// GET /v1/rides/{id}
pub async fn get_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<RideResponse>, ApiError> {
    let service = RideService::from_state(&state);
    Ok(Json(service.get_ride(ride_id).await?))
}

/// GET /v1/rides
pub async fn list_rides(
    State(state): State<AppState>,
) -> Result<Json<Vec<RideResponse>>, ApiError> {
    let service = RideService::from_state(&state);
    Ok(Json(service.list_rides().await?))
}

/// POST /v1/rides/{id}/cancel
pub async fn cancel_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<RideResponse>, ApiError> {
    let service = RideService::from_state(&state);
    Ok(Json(service.cancel_ride(ride_id).await?))
}

#[cfg(test)]
mod tests {
    use domain::models::{CreateRideRequest, PaymentMethod, VehicleClass};

    #[test]
    fn test_create_ride_request_deserialization() {
        let json = r#"{
            "rider_id": "550e8400-e29b-41d4-a716-446655440000",
            "pickup_lat": 12.9716,
            "pickup_lng": 77.5946,
            "pickup_address": "MG Road",
            "dest_lat": 12.9352,
            "dest_lng": 77.6245,
            "vehicle_type": "sedan",
            "payment_method": "card"
        }"#;
        let request: CreateRideRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.vehicle_type, VehicleClass::Sedan);
        assert_eq!(request.payment_method, PaymentMethod::Card);
        assert_eq!(request.pickup_address.as_deref(), Some("MG Road"));
    }
}
