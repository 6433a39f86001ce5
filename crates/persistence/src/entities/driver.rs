//! Driver entity (database row mapping).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{DriverResponse, DriverStatus, VehicleClass};

/// Database row mapping for the drivers table.
#[derive(Debug, Clone, FromRow)]
pub struct DriverEntity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub vehicle_type: String,
    pub status: String,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
    pub rating: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DriverEntity {
    /// Parsed availability status; rows written by this service always parse.
    pub fn driver_status(&self) -> DriverStatus {
        self.status.parse().unwrap_or(DriverStatus::Offline)
    }

    /// Parsed vehicle class, falling back to `mini` for unknown values.
    pub fn vehicle(&self) -> VehicleClass {
        self.vehicle_type.parse().unwrap_or(VehicleClass::Mini)
    }
}

impl From<DriverEntity> for DriverResponse {
    fn from(entity: DriverEntity) -> Self {
        let status = entity.driver_status();
        let vehicle_type = entity.vehicle();
        Self {
            id: entity.id,
            name: entity.name,
            email: entity.email,
            phone: entity.phone,
            vehicle_type,
            status,
            current_lat: entity.current_lat,
            current_lng: entity.current_lng,
            rating: entity.rating,
            created_at: entity.created_at,
        }
    }
}
