//! Demand-sensitive surge pricing.
//!
//! Demand is counted per zone (square grid cells of 0.01°); supply is the
//! number of live drivers within the supply radius. Multipliers are cached
//! per zone with a short TTL. Any cache failure degrades to a multiplier of
//! 1.0 rather than blocking ride creation.

use redis::aio::ConnectionManager;
use redis::RedisError;
use tracing::warn;

use crate::app::AppState;
use crate::config::SurgeConfig;
use persistence::cache::DriverLocationCache;

/// Width of a surge zone in degrees (~1.1 km at the equator).
pub const ZONE_GRID_SIZE: f64 = 0.01;

const DEMAND_PREFIX: &str = "surge:demand";
const MULTIPLIER_PREFIX: &str = "surge:multiplier";

/// Grid cell key for a coordinate, formatted to two decimals.
pub fn zone_key(lat: f64, lng: f64) -> String {
    let grid_lat = (lat / ZONE_GRID_SIZE).floor() * ZONE_GRID_SIZE;
    let grid_lng = (lng / ZONE_GRID_SIZE).floor() * ZONE_GRID_SIZE;
    format!("{grid_lat:.2}:{grid_lng:.2}")
}

/// Pure multiplier derivation from demand and supply.
///
/// No supply: maximum surge when there is any demand, baseline otherwise.
/// Otherwise half the excess demand ratio is applied, clamped to
/// `[1.0, max_multiplier]`, rounded to two decimals.
pub fn derive_multiplier(demand: i64, supply: usize, max_multiplier: f64) -> f64 {
    let raw = if supply == 0 {
        if demand > 0 {
            max_multiplier
        } else {
            1.0
        }
    } else {
        let ratio = demand as f64 / supply as f64;
        (1.0 + (ratio - 1.0) * 0.5).clamp(1.0, max_multiplier)
    };
    (raw * 100.0).round() / 100.0
}

/// Zone-level surge computation and caching.
#[derive(Clone)]
pub struct SurgeService {
    redis: ConnectionManager,
    location_cache: DriverLocationCache,
    config: SurgeConfig,
}

impl SurgeService {
    pub fn new(redis: ConnectionManager, config: SurgeConfig) -> Self {
        let location_cache = DriverLocationCache::new(redis.clone());
        Self {
            redis,
            location_cache,
            config,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.redis.clone(), state.config.surge.clone())
    }

    /// Count one unit of demand in the pickup's zone and refresh its TTL.
    pub async fn record_demand(&self, lat: f64, lng: f64) -> Result<(), RedisError> {
        let key = format!("{DEMAND_PREFIX}:{}", zone_key(lat, lng));
        let mut conn = self.redis.clone();
        redis::pipe()
            .cmd("INCR")
            .arg(&key)
            .ignore()
            .cmd("EXPIRE")
            .arg(&key)
            .arg(self.config.demand_ttl_secs)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
    }

    /// The zone's multiplier: cached value if present, recomputed and
    /// cached otherwise. Falls back to 1.0 when the cache is unreachable.
    pub async fn get_multiplier(&self, lat: f64, lng: f64, vehicle: &str) -> f64 {
        match self.lookup_or_compute(lat, lng, vehicle).await {
            Ok(multiplier) => multiplier,
            Err(err) => {
                warn!(error = %err, "Surge computation unavailable, using baseline");
                1.0
            }
        }
    }

    async fn lookup_or_compute(
        &self,
        lat: f64,
        lng: f64,
        vehicle: &str,
    ) -> Result<f64, RedisError> {
        let zone = zone_key(lat, lng);
        let mut conn = self.redis.clone();

        let cached: Option<f64> = redis::cmd("GET")
            .arg(format!("{MULTIPLIER_PREFIX}:{zone}"))
            .query_async(&mut conn)
            .await?;
        if let Some(multiplier) = cached {
            return Ok(multiplier);
        }

        let demand: Option<i64> = redis::cmd("GET")
            .arg(format!("{DEMAND_PREFIX}:{zone}"))
            .query_async(&mut conn)
            .await?;
        let supply = self
            .location_cache
            .count_nearby(lat, lng, vehicle, self.config.supply_radius_km)
            .await?;

        let multiplier =
            derive_multiplier(demand.unwrap_or(0), supply, self.config.max_multiplier);

        redis::cmd("SET")
            .arg(format!("{MULTIPLIER_PREFIX}:{zone}"))
            .arg(multiplier)
            .arg("EX")
            .arg(self.config.multiplier_ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(multiplier)
    }
}
