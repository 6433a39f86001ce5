//! Geo-index of live drivers, keyed by vehicle class.
//!
//! Each location ping lands in the vehicle's GEO set and refreshes the
//! driver's heartbeat key in the same pipelined batch. Absence of the
//! heartbeat means the driver is not alive, whatever the geo set says.

use redis::aio::ConnectionManager;
use redis::RedisError;
use uuid::Uuid;

const GEO_KEY_PREFIX: &str = "drivers:geo";
const HEARTBEAT_PREFIX: &str = "drivers:lastping";

/// Seconds a driver stays alive after their last location ping.
pub const HEARTBEAT_TTL_SECS: u64 = 30;

/// A candidate returned by a radius search, closest first.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyDriver {
    pub driver_id: String,
    pub distance_km: f64,
    pub lat: f64,
    pub lng: f64,
}

/// Redis GEO wrapper for driver location tracking.
#[derive(Clone)]
pub struct DriverLocationCache {
    conn: ConnectionManager,
}

impl DriverLocationCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn geo_key(vehicle: &str) -> String {
        format!("{GEO_KEY_PREFIX}:{vehicle}")
    }

    fn heartbeat_key(driver_id: Uuid) -> String {
        format!("{HEARTBEAT_PREFIX}:{driver_id}")
    }

    /// Upsert the driver's position and refresh the heartbeat in one batch.
    pub async fn update_location(
        &self,
        driver_id: Uuid,
        lat: f64,
        lng: f64,
        vehicle: &str,
        now_epoch: i64,
    ) -> Result<(), RedisError> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .cmd("GEOADD")
            .arg(Self::geo_key(vehicle))
            .arg(lng)
            .arg(lat)
            .arg(driver_id.to_string())
            .ignore()
            .cmd("SET")
            .arg(Self::heartbeat_key(driver_id))
            .arg(now_epoch)
            .arg("EX")
            .arg(HEARTBEAT_TTL_SECS)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
    }

    /// Drop the driver from the index and delete the heartbeat.
    pub async fn remove_driver(&self, driver_id: Uuid, vehicle: &str) -> Result<(), RedisError> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .cmd("ZREM")
            .arg(Self::geo_key(vehicle))
            .arg(driver_id.to_string())
            .ignore()
            .cmd("DEL")
            .arg(Self::heartbeat_key(driver_id))
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
    }

    /// Up to `count` drivers within `radius_km`, sorted ascending by
    /// distance. Ties keep the order Redis returns.
    pub async fn find_nearby(
        &self,
        lat: f64,
        lng: f64,
        vehicle: &str,
        radius_km: f64,
        count: usize,
    ) -> Result<Vec<NearbyDriver>, RedisError> {
        let mut conn = self.conn.clone();
        let rows: Vec<(String, f64, (f64, f64))> = redis::cmd("GEOSEARCH")
            .arg(Self::geo_key(vehicle))
            .arg("FROMLONLAT")
            .arg(lng)
            .arg(lat)
            .arg("BYRADIUS")
            .arg(radius_km)
            .arg("km")
            .arg("ASC")
            .arg("COUNT")
            .arg(count)
            .arg("WITHCOORD")
            .arg("WITHDIST")
            .query_async(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(driver_id, distance_km, (lng, lat))| NearbyDriver {
                driver_id,
                distance_km,
                lat,
                lng,
            })
            .collect())
    }

    /// Number of drivers within `radius_km`, uncapped.
    pub async fn count_nearby(
        &self,
        lat: f64,
        lng: f64,
        vehicle: &str,
        radius_km: f64,
    ) -> Result<usize, RedisError> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = redis::cmd("GEOSEARCH")
            .arg(Self::geo_key(vehicle))
            .arg("FROMLONLAT")
            .arg(lng)
            .arg(lat)
            .arg("BYRADIUS")
            .arg(radius_km)
            .arg("km")
            .query_async(&mut conn)
            .await?;
        Ok(members.len())
    }

    /// Whether the driver's heartbeat key still exists.
    pub async fn is_alive(&self, driver_id: Uuid) -> Result<bool, RedisError> {
        let mut conn = self.conn.clone();
        let exists: i64 = redis::cmd("EXISTS")
            .arg(Self::heartbeat_key(driver_id))
            .query_async(&mut conn)
            .await?;
        Ok(exists > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(DriverLocationCache::geo_key("mini"), "drivers:geo:mini");
        let id = Uuid::new_v4();
        assert_eq!(
            DriverLocationCache::heartbeat_key(id),
            format!("drivers:lastping:{id}")
        );
    }
}
