//! Payment processing: idempotent charge of a completed trip.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use domain::error::DispatchError;
use domain::models::{PaymentMethod, PaymentResponse, PaymentStatus, TripStatus};
use persistence::cache::IdempotencyCache;
use persistence::repositories::{
    IdempotencyKeyRepository, NewPayment, PaymentRepository, TripRepository,
};

/// Endpoint tag used by the idempotency store.
const PAYMENTS_ENDPOINT: &str = "payments";

struct PspCharge {
    transaction_id: String,
    status: PaymentStatus,
}

/// Charges completed trips through a mock payment provider.
#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
    payments: PaymentRepository,
    idempotency: IdempotencyKeyRepository,
    idempotency_cache: IdempotencyCache,
}

impl PaymentService {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            payments: PaymentRepository::new(state.pool.clone()),
            idempotency: IdempotencyKeyRepository::new(state.pool.clone()),
            idempotency_cache: IdempotencyCache::new(state.redis.clone()),
        }
    }

    /// Charge a completed trip. A repeated idempotency key is rejected with
    /// `DuplicateRequest`; the replay middleware serves the original
    /// response for byte-identical retries.
    pub async fn process_payment(
        &self,
        trip_id: Uuid,
        payment_method: PaymentMethod,
        idempotency_key: Option<String>,
    ) -> Result<PaymentResponse, ApiError> {
        if let Some(key) = &idempotency_key {
            if self.seen_before(key).await? {
                return Err(DispatchError::DuplicateRequest(key.clone()).into());
            }
        }

        let mut tx = self.pool.begin().await?;

        let Some(trip) = TripRepository::find_by_id_locked(&mut tx, trip_id).await? else {
            tx.rollback().await?;
            return Err(DispatchError::TripNotFound(trip_id).into());
        };
        if trip.trip_status() != TripStatus::Completed {
            tx.rollback().await?;
            return Err(DispatchError::Payment(format!(
                "Trip not completed (status: {})",
                trip.status
            ))
            .into());
        }

        if PaymentRepository::find_active_for_trip(&mut tx, trip_id)
            .await?
            .is_some()
        {
            tx.rollback().await?;
            return Err(
                DispatchError::Payment("Payment already exists for this trip".to_string()).into(),
            );
        }

        let payment = PaymentRepository::insert(
            &mut tx,
            NewPayment {
                trip_id,
                rider_id: trip.rider_id,
                amount: trip.total_fare,
                payment_method: payment_method.as_str().to_string(),
                idempotency_key: idempotency_key.clone(),
            },
        )
        .await?;

        let final_status = match payment_method {
            PaymentMethod::Cash => {
                PaymentRepository::update_status(&mut tx, payment.id, PaymentStatus::Succeeded)
                    .await?;
                PaymentStatus::Succeeded
            }
            PaymentMethod::Card | PaymentMethod::Wallet => {
                PaymentRepository::update_status(&mut tx, payment.id, PaymentStatus::Processing)
                    .await?;
                let charge = self.mock_psp_charge();
                PaymentRepository::set_psp_result(
                    &mut tx,
                    payment.id,
                    charge.status,
                    &charge.transaction_id,
                )
                .await?;
                charge.status
            }
        };

        let record = json!({
            "payment_id": payment.id.to_string(),
            "status": final_status.as_str(),
        });
        if let Some(key) = &idempotency_key {
            IdempotencyKeyRepository::store(&mut tx, key, PAYMENTS_ENDPOINT, 200, record.clone())
                .await?;
        }

        tx.commit().await?;

        if let Some(key) = &idempotency_key {
            if let Err(err) = self
                .idempotency_cache
                .put(key, PAYMENTS_ENDPOINT, &record)
                .await
            {
                warn!(error = %err, "Failed to mirror idempotency record to fast layer");
            }
        }

        info!(
            payment_id = %payment.id,
            trip_id = %trip_id,
            method = %payment_method,
            status = %final_status,
            "Payment processed"
        );

        let entity = self
            .payments
            .find_by_id(payment.id)
            .await?
            .ok_or_else(|| ApiError::Internal("Payment vanished after commit".to_string()))?;
        Ok(entity.into())
    }

    /// Has this key already certified a payment response? Checks the fast
    /// layer first, then the durable record.
    async fn seen_before(&self, key: &str) -> Result<bool, ApiError> {
        match self.idempotency_cache.get(key, PAYMENTS_ENDPOINT).await {
            Ok(Some(_)) => return Ok(true),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "Idempotency fast layer unavailable"),
        }
        Ok(self.idempotency.find(key, PAYMENTS_ENDPOINT).await?.is_some())
    }

    /// Simulated PSP call. Always succeeds.
    fn mock_psp_charge(&self) -> PspCharge {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect::<String>()
            .to_lowercase();
        PspCharge {
            transaction_id: format!("psp_{suffix}"),
            status: PaymentStatus::Succeeded,
        }
    }
}
