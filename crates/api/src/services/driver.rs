//! Driver-facing operations: heartbeats, status, lookup.

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use domain::error::DispatchError;
use domain::events::{notify_driver_event, EventBus, EventKind};
use domain::models::{DriverResponse, DriverStatus};
use persistence::cache::DriverLocationCache;
use persistence::repositories::DriverRepository;

/// Driver lifecycle orchestration.
#[derive(Clone)]
pub struct DriverService {
    pool: PgPool,
    drivers: DriverRepository,
    location_cache: DriverLocationCache,
    events: Arc<dyn EventBus>,
}

impl DriverService {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            drivers: DriverRepository::new(state.pool.clone()),
            location_cache: DriverLocationCache::new(state.redis.clone()),
            events: state.events.clone(),
        }
    }

    /// Fetch a driver by ID.
    pub async fn get_driver(&self, driver_id: Uuid) -> Result<DriverResponse, ApiError> {
        let driver = self
            .drivers
            .find_by_id(driver_id)
            .await?
            .ok_or(DispatchError::DriverNotFound(driver_id))?;
        Ok(driver.into())
    }

    /// All drivers, ordered by name.
    pub async fn list_drivers(&self) -> Result<Vec<DriverResponse>, ApiError> {
        let drivers = self.drivers.list_all().await?;
        Ok(drivers.into_iter().map(Into::into).collect())
    }

    /// Record a location heartbeat: update the row, refresh the geo index
    /// and heartbeat key, and publish the movement.
    pub async fn update_location(
        &self,
        driver_id: Uuid,
        lat: f64,
        lng: f64,
    ) -> Result<DriverResponse, ApiError> {
        let driver = self
            .drivers
            .update_position(driver_id, lat, lng)
            .await?
            .ok_or(DispatchError::DriverNotFound(driver_id))?;

        // Index write is best-effort: a dead heartbeat only hides the
        // driver from matching until the next ping lands.
        if let Err(err) = self
            .location_cache
            .update_location(
                driver.id,
                lat,
                lng,
                driver.vehicle().as_str(),
                Utc::now().timestamp(),
            )
            .await
        {
            warn!(driver_id = %driver_id, error = %err, "Geo index update failed");
        }

        notify_driver_event(
            self.events.as_ref(),
            driver_id,
            EventKind::DriverLocationUpdate,
            json!({
                "lat": lat,
                "lng": lng,
                "vehicle_type": driver.vehicle_type,
                "status": driver.status,
            }),
        )
        .await;

        Ok(driver.into())
    }

    /// Force a driver's availability status. Going offline drops the driver
    /// from the geo index.
    pub async fn set_status(
        &self,
        driver_id: Uuid,
        status: DriverStatus,
    ) -> Result<DriverResponse, ApiError> {
        let mut tx = self.pool.begin().await?;
        let Some(driver) = DriverRepository::find_by_id_locked(&mut tx, driver_id).await? else {
            tx.rollback().await?;
            return Err(DispatchError::DriverNotFound(driver_id).into());
        };
        let old_status = driver.driver_status();
        DriverRepository::set_status(&mut tx, driver_id, status).await?;
        tx.commit().await?;

        if status == DriverStatus::Offline {
            if let Err(err) = self
                .location_cache
                .remove_driver(driver_id, driver.vehicle().as_str())
                .await
            {
                warn!(driver_id = %driver_id, error = %err, "Geo index removal failed");
            }
        }

        info!(driver_id = %driver_id, from = %old_status, to = %status, "Driver status changed");
        notify_driver_event(
            self.events.as_ref(),
            driver_id,
            EventKind::DriverStatusChanged,
            json!({
                "old_status": old_status.as_str(),
                "new_status": status.as_str(),
            }),
        )
        .await;

        let refreshed = self
            .drivers
            .find_by_id(driver_id)
            .await?
            .ok_or(DispatchError::DriverNotFound(driver_id))?;
        Ok(refreshed.into())
    }
}
