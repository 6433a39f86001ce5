//! Payment entity (database row mapping).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{PaymentMethod, PaymentResponse, PaymentStatus};

/// Database row mapping for the payments table.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub rider_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
    pub status: String,
    pub idempotency_key: Option<String>,
    pub psp_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentEntity {
    /// Parsed processing status; rows written by this service always parse.
    pub fn payment_status(&self) -> PaymentStatus {
        self.status.parse().unwrap_or(PaymentStatus::Failed)
    }
}

impl From<PaymentEntity> for PaymentResponse {
    fn from(entity: PaymentEntity) -> Self {
        let status = entity.payment_status();
        let payment_method = entity
            .payment_method
            .parse()
            .unwrap_or(PaymentMethod::Cash);
        Self {
            id: entity.id,
            trip_id: entity.trip_id,
            rider_id: entity.rider_id,
            amount: entity.amount,
            payment_method,
            status,
            psp_transaction_id: entity.psp_transaction_id,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payment_response_conversion() {
        let entity = PaymentEntity {
            id: Uuid::new_v4(),
            trip_id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            amount: dec!(170.00),
            payment_method: "cash".to_string(),
            status: "succeeded".to_string(),
            idempotency_key: Some("abc-123".to_string()),
            psp_transaction_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let response: PaymentResponse = entity.clone().into();
        assert_eq!(response.status, PaymentStatus::Succeeded);
        assert_eq!(response.amount, dec!(170.00));
        assert_eq!(response.payment_method, PaymentMethod::Cash);
    }
}
