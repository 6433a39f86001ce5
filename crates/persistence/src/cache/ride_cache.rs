//! Short-TTL lookup cache for ride snapshots.

use redis::aio::ConnectionManager;
use redis::RedisError;
use uuid::Uuid;

use domain::models::RideResponse;

const KEY_PREFIX: &str = "ride";

/// Seconds a cached ride snapshot stays valid.
pub const RIDE_CACHE_TTL_SECS: u64 = 300;

/// Redis cache for ride request snapshots.
#[derive(Clone)]
pub struct RideCache {
    conn: ConnectionManager,
}

impl RideCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn key(ride_id: Uuid) -> String {
        format!("{KEY_PREFIX}:{ride_id}")
    }

    /// Store a ride snapshot.
    pub async fn set_ride(&self, ride: &RideResponse) -> Result<(), RedisError> {
        let payload = match serde_json::to_string(ride) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(ride_id = %ride.id, error = %err, "Failed to serialize ride snapshot");
                return Ok(());
            }
        };
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(Self::key(ride.id))
            .arg(payload)
            .arg("EX")
            .arg(RIDE_CACHE_TTL_SECS)
            .query_async::<_, ()>(&mut conn)
            .await
    }

    /// Fetch a cached ride snapshot, if present and still parseable.
    pub async fn get_ride(&self, ride_id: Uuid) -> Result<Option<RideResponse>, RedisError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::key(ride_id))
            .query_async(&mut conn)
            .await?;
        Ok(raw.and_then(|payload| serde_json::from_str(&payload).ok()))
    }

    /// Drop the cached snapshot after a state change.
    pub async fn invalidate(&self, ride_id: Uuid) -> Result<(), RedisError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(Self::key(ride_id))
            .query_async::<_, ()>(&mut conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id = Uuid::new_v4();
        assert_eq!(RideCache::key(id), format!("ride:{id}"));
    }
}
