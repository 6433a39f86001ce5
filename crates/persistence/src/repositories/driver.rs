//! Driver repository for database operations.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::DriverEntity;
use crate::metrics::QueryTimer;
use domain::models::DriverStatus;

const DRIVER_COLUMNS: &str =
    "id, name, email, phone, vehicle_type, status, current_lat, current_lng, rating, \
     created_at, updated_at";

/// Repository for driver database operations.
#[derive(Clone)]
pub struct DriverRepository {
    pool: PgPool,
}

impl DriverRepository {
    /// Creates a new DriverRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a driver by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<DriverEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_driver_by_id");

        let sql = format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE id = $1");
        let result = sqlx::query_as::<_, DriverEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;

        timer.record();
        result
    }

    /// List all drivers, ordered by name.
    pub async fn list_all(&self) -> Result<Vec<DriverEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_drivers");

        let sql = format!("SELECT {DRIVER_COLUMNS} FROM drivers ORDER BY name");
        let result = sqlx::query_as::<_, DriverEntity>(&sql)
            .fetch_all(&self.pool)
            .await;

        timer.record();
        result
    }

    /// Record a location heartbeat. Offline drivers come back online on
    /// their first ping.
    pub async fn update_position(
        &self,
        id: Uuid,
        lat: f64,
        lng: f64,
    ) -> Result<Option<DriverEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_driver_position");

        let sql = format!(
            r#"
            UPDATE drivers
            SET current_lat = $2,
                current_lng = $3,
                status = CASE WHEN status = 'offline' THEN 'available' ELSE status END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {DRIVER_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, DriverEntity>(&sql)
            .bind(id)
            .bind(lat)
            .bind(lng)
            .fetch_optional(&self.pool)
            .await;

        timer.record();
        result
    }

    /// Acquire an available driver with a row lock, skipping rows already
    /// locked by another matcher. Returns `None` when the driver is taken
    /// or not available.
    pub async fn lock_available(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<DriverEntity>, sqlx::Error> {
        let sql = format!(
            "SELECT {DRIVER_COLUMNS} FROM drivers \
             WHERE id = $1 AND status = 'available' \
             FOR UPDATE SKIP LOCKED"
        );
        sqlx::query_as::<_, DriverEntity>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Load a driver with a plain row lock, serializing status changes.
    pub async fn find_by_id_locked(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<DriverEntity>, sqlx::Error> {
        let sql = format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, DriverEntity>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Set a driver's availability status.
    pub async fn set_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: DriverStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE drivers SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
