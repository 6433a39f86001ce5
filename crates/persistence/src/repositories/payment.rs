//! Payment repository for database operations.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::PaymentEntity;
use crate::metrics::QueryTimer;
use domain::models::PaymentStatus;

const PAYMENT_COLUMNS: &str =
    "id, trip_id, rider_id, amount, payment_method, status, idempotency_key, \
     psp_transaction_id, created_at, updated_at";

/// Input data for inserting a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub trip_id: Uuid,
    pub rider_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
    pub idempotency_key: Option<String>,
}

/// Repository for payment database operations.
#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a payment by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_payment_by_id");

        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
        let result = sqlx::query_as::<_, PaymentEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;

        timer.record();
        result
    }

    /// The trip's payment in `processing` or `succeeded`, if any. At most
    /// one such row exists per trip.
    pub async fn find_active_for_trip(
        conn: &mut PgConnection,
        trip_id: Uuid,
    ) -> Result<Option<PaymentEntity>, sqlx::Error> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE trip_id = $1 AND status IN ('processing', 'succeeded')"
        );
        sqlx::query_as::<_, PaymentEntity>(&sql)
            .bind(trip_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Insert a payment in `pending`.
    pub async fn insert(
        conn: &mut PgConnection,
        input: NewPayment,
    ) -> Result<PaymentEntity, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO payments (trip_id, rider_id, amount, payment_method, status, idempotency_key)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING {PAYMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, PaymentEntity>(&sql)
            .bind(input.trip_id)
            .bind(input.rider_id)
            .bind(input.amount)
            .bind(&input.payment_method)
            .bind(&input.idempotency_key)
            .fetch_one(&mut *conn)
            .await
    }

    /// Set a payment's processing status.
    pub async fn update_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE payments SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Record the provider's outcome for a charge.
    pub async fn set_psp_result(
        conn: &mut PgConnection,
        id: Uuid,
        status: PaymentStatus,
        psp_transaction_id: &str,
    ) -> Result<PaymentEntity, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE payments
            SET status = $2, psp_transaction_id = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, PaymentEntity>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(psp_transaction_id)
            .fetch_one(&mut *conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_payment_input() {
        let input = NewPayment {
            trip_id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            amount: dec!(170.00),
            payment_method: "cash".to_string(),
            idempotency_key: Some("pay-001".to_string()),
        };
        assert_eq!(input.amount, dec!(170.00));
        assert!(input.idempotency_key.is_some());
    }
}
