//! Ride orchestration: create, lookup, accept/decline, cancel.

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::{MatchingService, SurgeService};
use domain::error::DispatchError;
use domain::events::{notify_ride_event, EventBus, EventKind};
use domain::models::{CreateRideRequest, DriverStatus, OfferStatus, RideResponse, RideStatus};
use persistence::cache::RideCache;
use persistence::repositories::{DriverRepository, NewRide, OfferRepository, RideRepository};
use shared::fare::estimate_fare;
use shared::geo::haversine_distance;

/// How many rides a listing returns at most.
const RIDE_LIST_LIMIT: i64 = 50;

/// Rider-facing ride lifecycle orchestration.
#[derive(Clone)]
pub struct RideService {
    pool: PgPool,
    rides: RideRepository,
    ride_cache: RideCache,
    surge: SurgeService,
    matching: MatchingService,
    events: Arc<dyn EventBus>,
    max_offers_per_ride: i32,
}

impl RideService {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            rides: RideRepository::new(state.pool.clone()),
            ride_cache: RideCache::new(state.redis.clone()),
            surge: SurgeService::from_state(state),
            matching: MatchingService::from_state(state),
            events: state.events.clone(),
            max_offers_per_ride: state.config.matching.max_offers_per_ride,
        }
    }

    /// Create a ride: freeze the surge multiplier, estimate the fare,
    /// persist in `matching`, and run one matching cycle inline.
    pub async fn create_ride(
        &self,
        payload: CreateRideRequest,
        idempotency_key: Option<String>,
    ) -> Result<RideResponse, ApiError> {
        if let Err(err) = self
            .surge
            .record_demand(payload.pickup_lat, payload.pickup_lng)
            .await
        {
            warn!(error = %err, "Failed to record surge demand");
        }

        let surge = self
            .surge
            .get_multiplier(
                payload.pickup_lat,
                payload.pickup_lng,
                payload.vehicle_type.as_str(),
            )
            .await;
        let surge = Decimal::from_f64_retain(surge)
            .unwrap_or(Decimal::ONE)
            .round_dp(2);

        let distance_km = haversine_distance(
            payload.pickup_lat,
            payload.pickup_lng,
            payload.dest_lat,
            payload.dest_lng,
        );
        let estimated_fare = estimate_fare(payload.vehicle_type.as_str(), distance_km, surge);

        let ride = self
            .rides
            .insert(NewRide {
                rider_id: payload.rider_id,
                pickup_lat: payload.pickup_lat,
                pickup_lng: payload.pickup_lng,
                pickup_address: payload.pickup_address,
                dest_lat: payload.dest_lat,
                dest_lng: payload.dest_lng,
                dest_address: payload.dest_address,
                vehicle_type: payload.vehicle_type.as_str().to_string(),
                payment_method: payload.payment_method.as_str().to_string(),
                surge_multiplier: surge,
                estimated_fare,
                idempotency_key,
                max_offers: self.max_offers_per_ride,
            })
            .await?;

        info!(
            ride_id = %ride.id,
            rider_id = %ride.rider_id,
            vehicle_type = %ride.vehicle_type,
            surge = %surge,
            "Ride created"
        );

        notify_ride_event(
            self.events.as_ref(),
            ride.id,
            EventKind::RideRequested,
            json!({
                "rider_id": ride.rider_id.to_string(),
                "pickup_lat": ride.pickup_lat,
                "pickup_lng": ride.pickup_lng,
                "dest_lat": ride.dest_lat,
                "dest_lng": ride.dest_lng,
                "vehicle_type": ride.vehicle_type,
                "surge_multiplier": surge.to_string(),
                "estimated_fare": estimated_fare.to_string(),
            }),
        )
        .await;

        self.matching.find_and_offer(&ride).await?;

        let refreshed = self
            .rides
            .find_by_id(ride.id)
            .await?
            .ok_or(DispatchError::RideNotFound(ride.id))?;
        Ok(refreshed.into())
    }

    /// Fetch a ride, serving the cached snapshot when it is fresh.
    pub async fn get_ride(&self, ride_id: Uuid) -> Result<RideResponse, ApiError> {
        match self.ride_cache.get_ride(ride_id).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(err) => warn!(ride_id = %ride_id, error = %err, "Ride cache read failed"),
        }

        let ride = self
            .rides
            .find_by_id(ride_id)
            .await?
            .ok_or(DispatchError::RideNotFound(ride_id))?;
        let response: RideResponse = ride.into();

        if let Err(err) = self.ride_cache.set_ride(&response).await {
            warn!(ride_id = %ride_id, error = %err, "Ride cache write failed");
        }
        Ok(response)
    }

    /// Most recent rides, newest first.
    pub async fn list_rides(&self) -> Result<Vec<RideResponse>, ApiError> {
        let rides = self.rides.list_recent(RIDE_LIST_LIMIT).await?;
        Ok(rides.into_iter().map(Into::into).collect())
    }

    /// A driver's answer to their pending offer.
    pub async fn accept_offer(
        &self,
        driver_id: Uuid,
        ride_id: Uuid,
        accept: bool,
    ) -> Result<RideResponse, ApiError> {
        let mut tx = self.pool.begin().await?;

        let Some(ride) = RideRepository::find_by_id_locked(&mut tx, ride_id).await? else {
            tx.rollback().await?;
            return Err(DispatchError::RideNotFound(ride_id).into());
        };
        let Some(offer) = OfferRepository::find_pending_locked(&mut tx, ride_id, driver_id).await?
        else {
            tx.rollback().await?;
            return Err(DispatchError::DriverUnavailable(
                "No pending offer found for this driver and ride".to_string(),
            )
            .into());
        };

        if !accept {
            offer.offer_status().transition(OfferStatus::Declined)?;
            ride.ride_status().transition(RideStatus::Matching)?;
            OfferRepository::update_status(&mut tx, offer.id, OfferStatus::Declined).await?;
            if let Some(driver) = DriverRepository::find_by_id_locked(&mut tx, driver_id).await? {
                if driver.driver_status() == DriverStatus::Busy {
                    DriverRepository::set_status(&mut tx, driver_id, DriverStatus::Available)
                        .await?;
                }
            }
            RideRepository::update_status(&mut tx, ride_id, RideStatus::Matching).await?;
            tx.commit().await?;

            info!(ride_id = %ride_id, driver_id = %driver_id, "Offer declined, re-matching");
            self.invalidate_cache(ride_id).await;

            let refreshed = self
                .rides
                .find_by_id(ride_id)
                .await?
                .ok_or(DispatchError::RideNotFound(ride_id))?;
            self.matching.find_and_offer(&refreshed).await?;

            let refreshed = self
                .rides
                .find_by_id(ride_id)
                .await?
                .ok_or(DispatchError::RideNotFound(ride_id))?;
            return Ok(refreshed.into());
        }

        offer.offer_status().transition(OfferStatus::Accepted)?;
        ride.ride_status().transition(RideStatus::Accepted)?;
        OfferRepository::update_status(&mut tx, offer.id, OfferStatus::Accepted).await?;
        RideRepository::set_accepted(&mut tx, ride_id, driver_id).await?;
        DriverRepository::set_status(&mut tx, driver_id, DriverStatus::OnTrip).await?;

        // Any other pending offer loses: expire it and free its driver.
        let others = OfferRepository::other_pending_locked(&mut tx, ride_id, offer.id).await?;
        for other in others {
            OfferRepository::update_status(&mut tx, other.id, OfferStatus::Expired).await?;
            if let Some(driver) =
                DriverRepository::find_by_id_locked(&mut tx, other.driver_id).await?
            {
                if driver.driver_status() == DriverStatus::Busy {
                    DriverRepository::set_status(&mut tx, other.driver_id, DriverStatus::Available)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        self.invalidate_cache(ride_id).await;

        info!(ride_id = %ride_id, driver_id = %driver_id, "Ride matched");

        let drivers = DriverRepository::new(self.pool.clone());
        let driver = drivers.find_by_id(driver_id).await?;
        notify_ride_event(
            self.events.as_ref(),
            ride_id,
            EventKind::RideMatched,
            json!({
                "driver_id": driver_id.to_string(),
                "driver_name": driver.as_ref().map(|d| d.name.clone()).unwrap_or_default(),
                "driver_lat": driver.as_ref().and_then(|d| d.current_lat),
                "driver_lng": driver.as_ref().and_then(|d| d.current_lng),
            }),
        )
        .await;

        let refreshed = self
            .rides
            .find_by_id(ride_id)
            .await?
            .ok_or(DispatchError::RideNotFound(ride_id))?;
        Ok(refreshed.into())
    }

    /// Cancel a ride that has not started its trip yet.
    pub async fn cancel_ride(&self, ride_id: Uuid) -> Result<RideResponse, ApiError> {
        let mut tx = self.pool.begin().await?;

        let Some(ride) = RideRepository::find_by_id_locked(&mut tx, ride_id).await? else {
            tx.rollback().await?;
            return Err(DispatchError::RideNotFound(ride_id).into());
        };

        let status = ride.ride_status();
        if !status.is_cancellable() {
            tx.rollback().await?;
            return Err(DispatchError::invalid_transition(status, RideStatus::Cancelled).into());
        }

        RideRepository::update_status(&mut tx, ride_id, RideStatus::Cancelled).await?;

        if let Some(driver_id) = ride.matched_driver_id {
            if let Some(driver) = DriverRepository::find_by_id_locked(&mut tx, driver_id).await? {
                if matches!(
                    driver.driver_status(),
                    DriverStatus::Busy | DriverStatus::OnTrip
                ) {
                    DriverRepository::set_status(&mut tx, driver_id, DriverStatus::Available)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        self.invalidate_cache(ride_id).await;

        info!(ride_id = %ride_id, from = %status, "Ride cancelled");
        notify_ride_event(
            self.events.as_ref(),
            ride_id,
            EventKind::RideCancelled,
            json!({"reason": "user_cancelled"}),
        )
        .await;

        let refreshed = self
            .rides
            .find_by_id(ride_id)
            .await?
            .ok_or(DispatchError::RideNotFound(ride_id))?;
        Ok(refreshed.into())
    }

    async fn invalidate_cache(&self, ride_id: Uuid) {
        if let Err(err) = self.ride_cache.invalidate(ride_id).await {
            warn!(ride_id = %ride_id, error = %err, "Ride cache invalidation failed");
        }
    }
}
