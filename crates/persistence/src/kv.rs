//! Redis connection management.
//!
//! The key-value store is a cache and coordination surface only; losing it
//! degrades matching and surge but never corrupts database state. The
//! [`ConnectionManager`] handle reconnects on its own, so individual command
//! failures surface per call site instead of poisoning the handle.

use redis::aio::ConnectionManager;

/// Redis configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Connects to Redis and returns an auto-reconnecting handle.
pub async fn create_connection(config: &RedisConfig) -> Result<ConnectionManager, redis::RedisError> {
    let client = redis::Client::open(config.url.as_str())?;
    ConnectionManager::new(client).await
}

/// Liveness probe for health reporting.
pub async fn ping(conn: &ConnectionManager) -> bool {
    let mut conn = conn.clone();
    redis::cmd("PING")
        .query_async::<_, String>(&mut conn)
        .await
        .is_ok()
}
