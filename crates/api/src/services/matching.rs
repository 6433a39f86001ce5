//! Matching engine: candidate search, offer issuance, expiry handling.
//!
//! At any instant a ride has at most one pending offer. That invariant is
//! held by issuing the offer and moving the ride to `offered` in one
//! transaction, serialized on the ride row, with the `(ride_id, driver_id)`
//! uniqueness constraint backstopping re-offers.

use chrono::{Duration, Utc};
use redis::aio::ConnectionManager;
use serde_json::json;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::config::MatchingConfig;
use crate::error::ApiError;
use domain::events::{notify_driver_event, notify_ride_event, EventBus, EventKind};
use domain::models::{DriverStatus, OfferStatus, RideStatus};
use persistence::cache::{DriverLocationCache, NearbyDriver, OfferExpiryQueue, RideCache};
use persistence::entities::{RideEntity, RideOfferEntity};
use persistence::repositories::{DriverRepository, OfferRepository, RideRepository};

/// Candidate search, driver locking, and offer lifecycle.
#[derive(Clone)]
pub struct MatchingService {
    pool: PgPool,
    location_cache: DriverLocationCache,
    expiry_queue: OfferExpiryQueue,
    ride_cache: RideCache,
    events: Arc<dyn EventBus>,
    config: MatchingConfig,
}

impl MatchingService {
    pub fn new(
        pool: PgPool,
        redis: ConnectionManager,
        events: Arc<dyn EventBus>,
        config: MatchingConfig,
    ) -> Self {
        Self {
            pool,
            location_cache: DriverLocationCache::new(redis.clone()),
            expiry_queue: OfferExpiryQueue::new(redis.clone()),
            ride_cache: RideCache::new(redis),
            events,
            config,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.pool.clone(),
            state.redis.clone(),
            state.events.clone(),
            state.config.matching.clone(),
        )
    }

    /// Try to issue an offer for a ride in `matching`.
    ///
    /// Returns the issued offer, or `None` when no candidate was offerable.
    /// Once `offers_made` reaches `max_offers` the ride terminates in
    /// `no_drivers`; otherwise it stays in `matching` awaiting new drivers.
    pub async fn find_and_offer(
        &self,
        ride: &RideEntity,
    ) -> Result<Option<RideOfferEntity>, ApiError> {
        let offers = OfferRepository::new(self.pool.clone());
        let excluded: HashSet<String> = offers
            .offered_driver_ids(ride.id)
            .await?
            .iter()
            .map(Uuid::to_string)
            .collect();

        let candidates = match self.candidates(ride).await {
            Ok(candidates) => candidates,
            Err(err) => {
                // No geo index means no matching, but the ride stays valid.
                warn!(ride_id = %ride.id, error = %err, "Candidate search unavailable");
                Vec::new()
            }
        };

        for candidate in candidates {
            if excluded.contains(&candidate.driver_id) {
                continue;
            }
            let Ok(driver_id) = Uuid::parse_str(&candidate.driver_id) else {
                continue;
            };
            match self.location_cache.is_alive(driver_id).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    warn!(driver_id = %driver_id, error = %err, "Heartbeat check failed");
                    continue;
                }
            }

            if let Some(offer) = self.lock_and_offer(ride, driver_id).await? {
                return Ok(Some(offer));
            }
        }

        self.finish_without_offer(ride.id).await?;
        Ok(None)
    }

    /// Radius search around the pickup, expanding once if empty.
    async fn candidates(&self, ride: &RideEntity) -> Result<Vec<NearbyDriver>, redis::RedisError> {
        let vehicle = ride.vehicle();
        let nearby = self
            .location_cache
            .find_nearby(
                ride.pickup_lat,
                ride.pickup_lng,
                vehicle.as_str(),
                self.config.initial_radius_km,
                self.config.candidate_count,
            )
            .await?;
        if !nearby.is_empty() {
            return Ok(nearby);
        }
        self.location_cache
            .find_nearby(
                ride.pickup_lat,
                ride.pickup_lng,
                vehicle.as_str(),
                self.config.expanded_radius_km,
                self.config.candidate_count,
            )
            .await
    }

    /// Atomically take an available driver and issue the offer.
    ///
    /// Returns `None` when the driver was locked by another matcher or is
    /// no longer available; the caller moves on to the next candidate.
    async fn lock_and_offer(
        &self,
        ride: &RideEntity,
        driver_id: Uuid,
    ) -> Result<Option<RideOfferEntity>, ApiError> {
        let mut tx = self.pool.begin().await?;

        let Some(current) = RideRepository::find_by_id_locked(&mut tx, ride.id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };
        if current.ride_status() != RideStatus::Matching {
            // Another actor (accept, cancel, concurrent matcher) moved the
            // ride; nothing to do.
            tx.rollback().await?;
            return Ok(None);
        }

        let Some(driver) = DriverRepository::lock_available(&mut tx, driver_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        DriverRepository::set_status(&mut tx, driver_id, DriverStatus::Busy).await?;
        let expires_at = Utc::now() + Duration::seconds(self.config.offer_ttl_secs);
        let offer = OfferRepository::insert(&mut tx, ride.id, driver_id, expires_at).await?;
        current.ride_status().transition(RideStatus::Offered)?;
        RideRepository::mark_offered(&mut tx, ride.id).await?;

        tx.commit().await?;
        self.invalidate_ride_cache(ride.id).await;

        // A lost enqueue is logged, not swallowed: the deadline scan picks
        // the offer up by expires_at.
        if let Err(err) = self
            .expiry_queue
            .enqueue(offer.id, expires_at.timestamp())
            .await
        {
            error!(
                offer_id = %offer.id,
                error = %err,
                "Failed to enqueue offer expiry, deferring to deadline scan"
            );
        }

        notify_driver_event(
            self.events.as_ref(),
            driver_id,
            EventKind::RideOffered,
            json!({
                "ride_id": ride.id.to_string(),
                "offer_id": offer.id.to_string(),
                "pickup_lat": ride.pickup_lat,
                "pickup_lng": ride.pickup_lng,
                "dest_lat": ride.dest_lat,
                "dest_lng": ride.dest_lng,
                "vehicle_type": ride.vehicle_type,
                "estimated_fare": ride.estimated_fare.map(|f| f.to_string()),
                "expires_at": expires_at.to_rfc3339(),
            }),
        )
        .await;
        notify_ride_event(
            self.events.as_ref(),
            ride.id,
            EventKind::RideOffered,
            json!({
                "driver_id": driver_id.to_string(),
                "driver_name": driver.name,
                "offer_id": offer.id.to_string(),
            }),
        )
        .await;

        Ok(Some(offer))
    }

    /// No candidate was offerable: terminate in `no_drivers` once every
    /// allowed offer has been made, otherwise leave the ride in `matching`.
    async fn finish_without_offer(&self, ride_id: Uuid) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;
        let Some(current) = RideRepository::find_by_id_locked(&mut tx, ride_id).await? else {
            tx.rollback().await?;
            return Ok(());
        };

        let exhausted = current.ride_status() == RideStatus::Matching
            && current.offers_made >= current.max_offers;
        if !exhausted {
            tx.rollback().await?;
            return Ok(());
        }

        RideRepository::update_status(&mut tx, ride_id, RideStatus::NoDrivers).await?;
        tx.commit().await?;
        self.invalidate_ride_cache(ride_id).await;

        notify_ride_event(
            self.events.as_ref(),
            ride_id,
            EventKind::RideNoDrivers,
            json!({"reason": "max_offers_exhausted"}),
        )
        .await;
        Ok(())
    }

    /// Process one expired offer id popped from the expiry queue.
    ///
    /// Idempotent against replays: anything already non-pending is skipped.
    pub async fn handle_offer_expired(&self, offer_id: Uuid) -> Result<(), ApiError> {
        let offers = OfferRepository::new(self.pool.clone());
        let Some(peek) = offers.find_by_id(offer_id).await? else {
            return Ok(());
        };
        if peek.offer_status() != OfferStatus::Pending {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        // Lock order matches accept/decline: ride row first, then offer.
        let ride = RideRepository::find_by_id_locked(&mut tx, peek.ride_id).await?;
        let Some(offer) = OfferRepository::find_pending_by_id_locked(&mut tx, offer_id).await?
        else {
            tx.rollback().await?;
            return Ok(());
        };

        offer.offer_status().transition(OfferStatus::Expired)?;
        OfferRepository::update_status(&mut tx, offer_id, OfferStatus::Expired).await?;

        if let Some(driver) = DriverRepository::find_by_id_locked(&mut tx, offer.driver_id).await? {
            if driver.driver_status() == DriverStatus::Busy {
                DriverRepository::set_status(&mut tx, driver.id, DriverStatus::Available).await?;
            }
        }

        let rematch = ride
            .as_ref()
            .map(|r| r.ride_status() == RideStatus::Offered)
            .unwrap_or(false);
        if rematch {
            RideRepository::update_status(&mut tx, peek.ride_id, RideStatus::Matching).await?;
        }

        tx.commit().await?;
        self.invalidate_ride_cache(peek.ride_id).await;

        if rematch {
            let rides = RideRepository::new(self.pool.clone());
            if let Some(ride) = rides.find_by_id(peek.ride_id).await? {
                self.find_and_offer(&ride).await?;
            }
        }
        Ok(())
    }

    async fn invalidate_ride_cache(&self, ride_id: Uuid) {
        if let Err(err) = self.ride_cache.invalidate(ride_id).await {
            warn!(ride_id = %ride_id, error = %err, "Ride cache invalidation failed");
        }
    }
}
