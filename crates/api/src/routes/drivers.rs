//! Driver endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::{DriverService, RideService};
use domain::models::{DriverAcceptRequest, DriverLocationUpdate, DriverResponse, RideResponse};

/// POST /v1/drivers/{id}/location
pub async fn update_location(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
    Json(request): Json<DriverLocationUpdate>,
) -> Result<Json<DriverResponse>, ApiError> {
    request.validate()?;

    let service = DriverService::from_state(&state);
    Ok(Json(
        service
            .update_location(driver_id, request.lat, request.lng)
            .await?,
    ))
}

/// POST /v1/drivers/{id}/accept
pub async fn accept_ride(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
    Json(request): Json<DriverAcceptRequest>,
) -> Result<Json<RideResponse>, ApiError> {
    let service = RideService::from_state(&state);
    Ok(Json(
        service
            .accept_offer(driver_id, request.ride_id, request.accept)
            .await?,
    ))
}

/// GET /v1/drivers
pub async fn list_drivers(
    State(state): State<AppState>,
) -> Result<Json<Vec<DriverResponse>>, ApiError> {
    let service = DriverService::from_state(&state);
    Ok(Json(service.list_drivers().await?))
}

/// GET /v1/drivers/{id}
pub async fn get_driver(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<DriverResponse>, ApiError> {
    let service = DriverService::from_state(&state);
    Ok(Json(service.get_driver(driver_id).await?))
}

#[cfg(test)]
mod tests {
    use domain::models::DriverLocationUpdate;
    use validator::Validate;

    #[test]
    fn test_location_update_deserialization() {
        let json = r#"{"lat": 12.9716, "lng": 77.5946}"#;
        let request: DriverLocationUpdate = serde_json::from_str(json).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.lat, 12.9716);
    }
}
