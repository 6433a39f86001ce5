//! Trip repository for database operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::TripEntity;
use crate::metrics::QueryTimer;
use shared::fare::FareBreakdown;

const TRIP_COLUMNS: &str =
    "id, ride_id, driver_id, rider_id, status, started_at, completed_at, distance_m, \
     duration_s, base_fare, distance_fare, time_fare, surge_multiplier, total_fare, \
     created_at, updated_at";

/// Repository for trip database operations.
#[derive(Clone)]
pub struct TripRepository {
    pool: PgPool,
}

impl TripRepository {
    /// Creates a new TripRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a trip by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TripEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_trip_by_id");

        let sql = format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1");
        let result = sqlx::query_as::<_, TripEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;

        timer.record();
        result
    }

    /// Insert a trip for an accepted ride. Trips go straight to
    /// `in_progress` and carry the surge frozen at ride creation. The
    /// unique constraint on `ride_id` guarantees one trip per ride.
    pub async fn insert(
        conn: &mut PgConnection,
        ride_id: Uuid,
        driver_id: Uuid,
        rider_id: Uuid,
        surge_multiplier: Decimal,
    ) -> Result<TripEntity, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO trips (ride_id, driver_id, rider_id, status, surge_multiplier)
            VALUES ($1, $2, $3, 'in_progress', $4)
            RETURNING {TRIP_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TripEntity>(&sql)
            .bind(ride_id)
            .bind(driver_id)
            .bind(rider_id)
            .bind(surge_multiplier)
            .fetch_one(&mut *conn)
            .await
    }

    /// Load a trip with a row lock.
    pub async fn find_by_id_locked(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<TripEntity>, sqlx::Error> {
        let sql = format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, TripEntity>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Complete a trip: store measured telemetry and the fare breakdown.
    pub async fn complete(
        conn: &mut PgConnection,
        id: Uuid,
        distance_m: i64,
        duration_s: i64,
        fare: &FareBreakdown,
        completed_at: DateTime<Utc>,
    ) -> Result<TripEntity, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE trips
            SET status = 'completed',
                completed_at = $2,
                distance_m = $3,
                duration_s = $4,
                base_fare = $5,
                distance_fare = $6,
                time_fare = $7,
                total_fare = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TRIP_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TripEntity>(&sql)
            .bind(id)
            .bind(completed_at)
            .bind(distance_m)
            .bind(duration_s)
            .bind(fare.base_fare)
            .bind(fare.distance_fare)
            .bind(fare.time_fare)
            .bind(fare.total_fare)
            .fetch_one(&mut *conn)
            .await
    }
}
