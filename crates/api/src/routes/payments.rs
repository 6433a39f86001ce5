//! Payment endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::OptionalIdempotencyKey;
use crate::services::PaymentService;
use domain::models::{CreatePaymentRequest, PaymentResponse};

/// POST /v1/payments
pub async fn create_payment(
    State(state): State<AppState>,
    OptionalIdempotencyKey(idempotency_key): OptionalIdempotencyKey,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let service = PaymentService::from_state(&state);
    let payment = service
        .process_payment(request.trip_id, request.payment_method, idempotency_key)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[cfg(test)]
mod tests {
    use domain::models::{CreatePaymentRequest, PaymentMethod};

    #[test]
    fn test_create_payment_request_deserialization() {
        let json = r#"{"trip_id": "550e8400-e29b-41d4-a716-446655440000", "payment_method": "cash"}"#;
        let request: CreatePaymentRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.payment_method, PaymentMethod::Cash);
    }
}
