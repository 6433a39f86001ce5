//! Ride offer repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::RideOfferEntity;
use crate::metrics::QueryTimer;
use domain::models::OfferStatus;

const OFFER_COLUMNS: &str =
    "id, ride_id, driver_id, status, expires_at, created_at, updated_at";

/// Repository for ride offer database operations.
#[derive(Clone)]
pub struct OfferRepository {
    pool: PgPool,
}

impl OfferRepository {
    /// Creates a new OfferRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an offer by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RideOfferEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_offer_by_id");

        let sql = format!("SELECT {OFFER_COLUMNS} FROM ride_offers WHERE id = $1");
        let result = sqlx::query_as::<_, RideOfferEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;

        timer.record();
        result
    }

    /// Every driver this ride was ever offered to, regardless of offer
    /// status. This is the matcher's exclusion set.
    pub async fn offered_driver_ids(&self, ride_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let timer = QueryTimer::new("offered_driver_ids");

        let result = sqlx::query_scalar::<_, Uuid>(
            "SELECT driver_id FROM ride_offers WHERE ride_id = $1",
        )
        .bind(ride_id)
        .fetch_all(&self.pool)
        .await;

        timer.record();
        result
    }

    /// Pending offers whose deadline has passed. Fallback path for when the
    /// expiry queue in Redis is unavailable.
    pub async fn expired_pending_ids(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        let timer = QueryTimer::new("expired_pending_offer_ids");

        let result = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM ride_offers WHERE status = 'pending' AND expires_at <= $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await;

        timer.record();
        result
    }

    /// Insert a pending offer. The `(ride_id, driver_id)` uniqueness
    /// constraint rejects re-offering a driver the same ride.
    pub async fn insert(
        conn: &mut PgConnection,
        ride_id: Uuid,
        driver_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RideOfferEntity, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO ride_offers (ride_id, driver_id, status, expires_at)
            VALUES ($1, $2, 'pending', $3)
            RETURNING {OFFER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, RideOfferEntity>(&sql)
            .bind(ride_id)
            .bind(driver_id)
            .bind(expires_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Load the pending offer for a `(ride, driver)` pair with a row lock.
    pub async fn find_pending_locked(
        conn: &mut PgConnection,
        ride_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Option<RideOfferEntity>, sqlx::Error> {
        let sql = format!(
            "SELECT {OFFER_COLUMNS} FROM ride_offers \
             WHERE ride_id = $1 AND driver_id = $2 AND status = 'pending' \
             FOR UPDATE"
        );
        sqlx::query_as::<_, RideOfferEntity>(&sql)
            .bind(ride_id)
            .bind(driver_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Load an offer by ID with a row lock, only while it is still pending.
    /// Expiry replays come through here, so a second pop is a no-op.
    pub async fn find_pending_by_id_locked(
        conn: &mut PgConnection,
        offer_id: Uuid,
    ) -> Result<Option<RideOfferEntity>, sqlx::Error> {
        let sql = format!(
            "SELECT {OFFER_COLUMNS} FROM ride_offers \
             WHERE id = $1 AND status = 'pending' \
             FOR UPDATE"
        );
        sqlx::query_as::<_, RideOfferEntity>(&sql)
            .bind(offer_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Other pending offers for the same ride, locked for update.
    pub async fn other_pending_locked(
        conn: &mut PgConnection,
        ride_id: Uuid,
        exclude_offer_id: Uuid,
    ) -> Result<Vec<RideOfferEntity>, sqlx::Error> {
        let sql = format!(
            "SELECT {OFFER_COLUMNS} FROM ride_offers \
             WHERE ride_id = $1 AND id <> $2 AND status = 'pending' \
             FOR UPDATE"
        );
        sqlx::query_as::<_, RideOfferEntity>(&sql)
            .bind(ride_id)
            .bind(exclude_offer_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Set an offer's status.
    pub async fn update_status(
        conn: &mut PgConnection,
        offer_id: Uuid,
        status: OfferStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE ride_offers SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(offer_id)
            .bind(status.as_str())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
