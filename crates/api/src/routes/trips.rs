//! Trip endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::TripService;
use domain::models::{TripEndRequest, TripResponse};

/// POST /v1/trips/{ride_id}/start
pub async fn start_trip(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<TripResponse>, ApiError> {
    let service = TripService::from_state(&state);
    Ok(Json(service.start_trip(ride_id).await?))
}

/// POST /v1/trips/{id}/end
pub async fn end_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(request): Json<TripEndRequest>,
) -> Result<Json<TripResponse>, ApiError> {
    request.validate()?;

    let service = TripService::from_state(&state);
    Ok(Json(
        service
            .end_trip(trip_id, request.distance_m, request.duration_s)
            .await?,
    ))
}

/// GET /v1/trips/{id}
pub async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripResponse>, ApiError> {
    let service = TripService::from_state(&state);
    Ok(Json(service.get_trip(trip_id).await?))
}

#[cfg(test)]
mod tests {
    use domain::models::TripEndRequest;

    #[test]
    fn test_end_request_deserialization() {
        let json = r#"{"distance_m": 5000, "duration_s": 1200}"#;
        let request: TripEndRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.distance_m, 5000);
        assert_eq!(request.duration_s, 1200);
    }
}
