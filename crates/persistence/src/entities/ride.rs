//! Ride request and ride offer entities (database row mappings).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{
    OfferStatus, PaymentMethod, RideOfferResponse, RideResponse, RideStatus, VehicleClass,
};

/// Database row mapping for the ride_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct RideEntity {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub status: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub pickup_address: Option<String>,
    pub dest_lat: f64,
    pub dest_lng: f64,
    pub dest_address: Option<String>,
    pub vehicle_type: String,
    pub payment_method: String,
    pub surge_multiplier: Decimal,
    pub estimated_fare: Option<Decimal>,
    pub matched_driver_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
    pub offers_made: i32,
    pub max_offers: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RideEntity {
    /// Parsed lifecycle status; rows written by this service always parse.
    pub fn ride_status(&self) -> RideStatus {
        self.status.parse().unwrap_or(RideStatus::Pending)
    }

    /// Parsed vehicle class, falling back to `mini` for unknown values.
    pub fn vehicle(&self) -> VehicleClass {
        self.vehicle_type.parse().unwrap_or(VehicleClass::Mini)
    }
}

impl From<RideEntity> for RideResponse {
    fn from(entity: RideEntity) -> Self {
        let status = entity.ride_status();
        let vehicle_type = entity.vehicle();
        let payment_method = entity
            .payment_method
            .parse()
            .unwrap_or(PaymentMethod::Cash);
        Self {
            id: entity.id,
            rider_id: entity.rider_id,
            status,
            pickup_lat: entity.pickup_lat,
            pickup_lng: entity.pickup_lng,
            pickup_address: entity.pickup_address,
            dest_lat: entity.dest_lat,
            dest_lng: entity.dest_lng,
            dest_address: entity.dest_address,
            vehicle_type,
            payment_method,
            surge_multiplier: entity.surge_multiplier,
            estimated_fare: entity.estimated_fare,
            matched_driver_id: entity.matched_driver_id,
            offers_made: entity.offers_made,
            max_offers: entity.max_offers,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the ride_offers table.
#[derive(Debug, Clone, FromRow)]
pub struct RideOfferEntity {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RideOfferEntity {
    /// Parsed offer status; rows written by this service always parse.
    pub fn offer_status(&self) -> OfferStatus {
        self.status.parse().unwrap_or(OfferStatus::Expired)
    }
}

impl From<RideOfferEntity> for RideOfferResponse {
    fn from(entity: RideOfferEntity) -> Self {
        let status = entity.offer_status();
        Self {
            id: entity.id,
            ride_id: entity.ride_id,
            driver_id: entity.driver_id,
            status,
            expires_at: entity.expires_at,
            created_at: entity.created_at,
        }
    }
}
