//! Ride request repository for database operations.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::RideEntity;
use crate::metrics::QueryTimer;
use domain::models::RideStatus;

const RIDE_COLUMNS: &str =
    "id, rider_id, status, pickup_lat, pickup_lng, pickup_address, dest_lat, dest_lng, \
     dest_address, vehicle_type, payment_method, surge_multiplier, estimated_fare, \
     matched_driver_id, idempotency_key, offers_made, max_offers, created_at, updated_at";

/// Input data for inserting a ride request.
#[derive(Debug, Clone)]
pub struct NewRide {
    pub rider_id: Uuid,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub pickup_address: Option<String>,
    pub dest_lat: f64,
    pub dest_lng: f64,
    pub dest_address: Option<String>,
    pub vehicle_type: String,
    pub payment_method: String,
    pub surge_multiplier: Decimal,
    pub estimated_fare: Decimal,
    pub idempotency_key: Option<String>,
    pub max_offers: i32,
}

/// Repository for ride request database operations.
#[derive(Clone)]
pub struct RideRepository {
    pool: PgPool,
}

impl RideRepository {
    /// Creates a new RideRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new ride request. Rides enter the lifecycle in `matching`.
    pub async fn insert(&self, input: NewRide) -> Result<RideEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_ride");

        let sql = format!(
            r#"
            INSERT INTO ride_requests (
                rider_id, status, pickup_lat, pickup_lng, pickup_address,
                dest_lat, dest_lng, dest_address, vehicle_type, payment_method,
                surge_multiplier, estimated_fare, idempotency_key, max_offers
            )
            VALUES ($1, 'matching', $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {RIDE_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, RideEntity>(&sql)
            .bind(input.rider_id)
            .bind(input.pickup_lat)
            .bind(input.pickup_lng)
            .bind(&input.pickup_address)
            .bind(input.dest_lat)
            .bind(input.dest_lng)
            .bind(&input.dest_address)
            .bind(&input.vehicle_type)
            .bind(&input.payment_method)
            .bind(input.surge_multiplier)
            .bind(input.estimated_fare)
            .bind(&input.idempotency_key)
            .bind(input.max_offers)
            .fetch_one(&self.pool)
            .await;

        timer.record();
        result
    }

    /// Find a ride by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RideEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_ride_by_id");

        let sql = format!("SELECT {RIDE_COLUMNS} FROM ride_requests WHERE id = $1");
        let result = sqlx::query_as::<_, RideEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;

        timer.record();
        result
    }

    /// List the most recent rides, newest first.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<RideEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_recent_rides");

        let sql = format!(
            "SELECT {RIDE_COLUMNS} FROM ride_requests ORDER BY created_at DESC LIMIT $1"
        );
        let result = sqlx::query_as::<_, RideEntity>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await;

        timer.record();
        result
    }

    /// Load a ride with a row lock. All state-mutating operations on a ride
    /// serialize on this lock.
    pub async fn find_by_id_locked(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<RideEntity>, sqlx::Error> {
        let sql = format!("SELECT {RIDE_COLUMNS} FROM ride_requests WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, RideEntity>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Set a ride's lifecycle status.
    pub async fn update_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: RideStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE ride_requests SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Move a ride to `offered` and count the issued offer in one write, so
    /// `offers_made` can never drift from the offer rows.
    pub async fn mark_offered(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE ride_requests \
             SET status = 'offered', offers_made = offers_made + 1, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Bind the accepted driver and move the ride to `accepted`.
    pub async fn set_accepted(
        conn: &mut PgConnection,
        id: Uuid,
        driver_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE ride_requests \
             SET status = 'accepted', matched_driver_id = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(driver_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_ride_input() {
        let input = NewRide {
            rider_id: Uuid::new_v4(),
            pickup_lat: 12.9716,
            pickup_lng: 77.5946,
            pickup_address: Some("MG Road".to_string()),
            dest_lat: 12.9352,
            dest_lng: 77.6245,
            dest_address: None,
            vehicle_type: "mini".to_string(),
            payment_method: "cash".to_string(),
            surge_multiplier: dec!(1.00),
            estimated_fare: dec!(108.00),
            idempotency_key: None,
            max_offers: 3,
        };
        assert_eq!(input.vehicle_type, "mini");
        assert_eq!(input.surge_multiplier, dec!(1.00));
    }
}
