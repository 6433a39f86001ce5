//! Trip lifecycle: start on pickup, end with fare settlement.

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use domain::error::DispatchError;
use domain::events::{notify_ride_event, EventBus, EventKind};
use domain::models::{DriverStatus, RideStatus, TripResponse, TripStatus};
use persistence::cache::RideCache;
use persistence::repositories::{DriverRepository, RideRepository, TripRepository};
use shared::fare::calculate_fare;

/// Trip orchestration.
#[derive(Clone)]
pub struct TripService {
    pool: PgPool,
    trips: TripRepository,
    ride_cache: RideCache,
    events: Arc<dyn EventBus>,
}

impl TripService {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            trips: TripRepository::new(state.pool.clone()),
            ride_cache: RideCache::new(state.redis.clone()),
            events: state.events.clone(),
        }
    }

    /// Begin the trip for an accepted ride. The trip is created directly
    /// `in_progress` and inherits the surge frozen at ride creation.
    pub async fn start_trip(&self, ride_id: Uuid) -> Result<TripResponse, ApiError> {
        let mut tx = self.pool.begin().await?;

        let Some(ride) = RideRepository::find_by_id_locked(&mut tx, ride_id).await? else {
            tx.rollback().await?;
            return Err(DispatchError::RideNotFound(ride_id).into());
        };

        let status = ride.ride_status();
        if !matches!(
            status,
            RideStatus::Accepted | RideStatus::DriverEnRoute | RideStatus::Arrived
        ) {
            tx.rollback().await?;
            return Err(DispatchError::invalid_transition(status, RideStatus::InTrip).into());
        }

        let Some(driver_id) = ride.matched_driver_id else {
            tx.rollback().await?;
            return Err(
                DispatchError::DriverUnavailable("Ride has no matched driver".to_string()).into(),
            );
        };

        RideRepository::update_status(&mut tx, ride_id, RideStatus::InTrip).await?;
        let trip = TripRepository::insert(
            &mut tx,
            ride_id,
            driver_id,
            ride.rider_id,
            ride.surge_multiplier,
        )
        .await?;

        tx.commit().await?;
        self.invalidate_ride_cache(ride_id).await;

        info!(ride_id = %ride_id, trip_id = %trip.id, "Trip started");
        notify_ride_event(
            self.events.as_ref(),
            ride_id,
            EventKind::RideStarted,
            json!({"trip_id": trip.id.to_string()}),
        )
        .await;

        Ok(trip.into())
    }

    /// End a trip with measured telemetry: price it, complete the ride,
    /// and put the driver back into rotation.
    pub async fn end_trip(
        &self,
        trip_id: Uuid,
        distance_m: i64,
        duration_s: i64,
    ) -> Result<TripResponse, ApiError> {
        let mut tx = self.pool.begin().await?;

        let Some(trip) = TripRepository::find_by_id_locked(&mut tx, trip_id).await? else {
            tx.rollback().await?;
            return Err(DispatchError::TripNotFound(trip_id).into());
        };

        let status = trip.trip_status();
        if !status.is_endable() {
            tx.rollback().await?;
            return Err(DispatchError::invalid_transition(status, TripStatus::Completed).into());
        }

        let ride = RideRepository::find_by_id_locked(&mut tx, trip.ride_id).await?;
        let vehicle = ride
            .as_ref()
            .map(|r| r.vehicle().as_str())
            .unwrap_or("mini");

        let fare = calculate_fare(
            vehicle,
            distance_m as f64 / 1000.0,
            duration_s as f64 / 60.0,
            trip.surge_multiplier,
        );

        let completed = TripRepository::complete(
            &mut tx,
            trip.id,
            distance_m,
            duration_s,
            &fare,
            Utc::now(),
        )
        .await?;

        if let Some(ride) = &ride {
            ride.ride_status().transition(RideStatus::Completed)?;
            RideRepository::update_status(&mut tx, ride.id, RideStatus::Completed).await?;
        }

        if let Some(driver) = DriverRepository::find_by_id_locked(&mut tx, trip.driver_id).await? {
            DriverRepository::set_status(&mut tx, driver.id, DriverStatus::Available).await?;
        }

        tx.commit().await?;
        self.invalidate_ride_cache(trip.ride_id).await;

        info!(
            trip_id = %trip_id,
            total_fare = %completed.total_fare,
            distance_m,
            duration_s,
            "Trip completed"
        );
        notify_ride_event(
            self.events.as_ref(),
            trip.ride_id,
            EventKind::RideCompleted,
            json!({
                "trip_id": trip.id.to_string(),
                "distance_m": distance_m,
                "duration_s": duration_s,
                "base_fare": fare.base_fare.to_string(),
                "distance_fare": fare.distance_fare.to_string(),
                "time_fare": fare.time_fare.to_string(),
                "surge_multiplier": fare.surge_multiplier.to_string(),
                "total_fare": fare.total_fare.to_string(),
            }),
        )
        .await;

        Ok(completed.into())
    }

    /// Fetch a trip by ID.
    pub async fn get_trip(&self, trip_id: Uuid) -> Result<TripResponse, ApiError> {
        let trip = self
            .trips
            .find_by_id(trip_id)
            .await?
            .ok_or(DispatchError::TripNotFound(trip_id))?;
        Ok(trip.into())
    }

    async fn invalidate_ride_cache(&self, ride_id: Uuid) {
        if let Err(err) = self.ride_cache.invalidate(ride_id).await {
            warn!(ride_id = %ride_id, error = %err, "Ride cache invalidation failed");
        }
    }
}
