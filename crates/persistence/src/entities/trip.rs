//! Trip entity (database row mapping).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{TripResponse, TripStatus};

/// Database row mapping for the trips table.
#[derive(Debug, Clone, FromRow)]
pub struct TripEntity {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub rider_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub distance_m: i64,
    pub duration_s: i64,
    pub base_fare: Decimal,
    pub distance_fare: Decimal,
    pub time_fare: Decimal,
    pub surge_multiplier: Decimal,
    pub total_fare: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TripEntity {
    /// Parsed lifecycle status; rows written by this service always parse.
    pub fn trip_status(&self) -> TripStatus {
        self.status.parse().unwrap_or(TripStatus::Cancelled)
    }
}

impl From<TripEntity> for TripResponse {
    fn from(entity: TripEntity) -> Self {
        let status = entity.trip_status();
        Self {
            id: entity.id,
            ride_id: entity.ride_id,
            driver_id: entity.driver_id,
            rider_id: entity.rider_id,
            status,
            started_at: entity.started_at,
            completed_at: entity.completed_at,
            distance_m: entity.distance_m,
            duration_s: entity.duration_s,
            base_fare: entity.base_fare,
            distance_fare: entity.distance_fare,
            time_fare: entity.time_fare,
            surge_multiplier: entity.surge_multiplier,
            total_fare: entity.total_fare,
            created_at: entity.created_at,
        }
    }
}
