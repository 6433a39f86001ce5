//! Fast layer of the idempotency store.
//!
//! Keys follow `idemp:{key}:{endpoint}`; the durable layer lives in the
//! idempotency_keys table.

use redis::aio::ConnectionManager;
use redis::RedisError;

const KEY_PREFIX: &str = "idemp";

/// Seconds a fast-layer idempotency entry stays valid.
pub const IDEMPOTENCY_TTL_SECS: u64 = 3600;

/// Redis-backed fast lookup for idempotent request results.
#[derive(Clone)]
pub struct IdempotencyCache {
    conn: ConnectionManager,
}

impl IdempotencyCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn cache_key(key: &str, endpoint: &str) -> String {
        format!("{KEY_PREFIX}:{key}:{endpoint}")
    }

    /// Fetch the recorded result for `(key, endpoint)`, if any.
    pub async fn get(
        &self,
        key: &str,
        endpoint: &str,
    ) -> Result<Option<serde_json::Value>, RedisError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::cache_key(key, endpoint))
            .query_async(&mut conn)
            .await?;
        Ok(raw.and_then(|payload| serde_json::from_str(&payload).ok()))
    }

    /// Mirror a recorded result into the fast layer.
    pub async fn put(
        &self,
        key: &str,
        endpoint: &str,
        value: &serde_json::Value,
    ) -> Result<(), RedisError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(Self::cache_key(key, endpoint))
            .arg(value.to_string())
            .arg("EX")
            .arg(IDEMPOTENCY_TTL_SECS)
            .query_async::<_, ()>(&mut conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(
            IdempotencyCache::cache_key("pay-001", "payments"),
            "idemp:pay-001:payments"
        );
    }
}
