//! Persistent time-ordered queue of offer deadlines.
//!
//! A sorted set scored by `expires_at` epoch seconds. A single poller pops
//! due entries; the queue lives in Redis so it survives process restarts.

use redis::aio::ConnectionManager;
use redis::RedisError;
use uuid::Uuid;

/// Sorted-set key holding offer ids scored by deadline.
pub const OFFER_EXPIRY_QUEUE_KEY: &str = "offer_expiry_queue";

/// Expiry queue handle.
#[derive(Clone)]
pub struct OfferExpiryQueue {
    conn: ConnectionManager,
}

impl OfferExpiryQueue {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Schedule an offer for expiry processing at its deadline.
    pub async fn enqueue(&self, offer_id: Uuid, expires_at_epoch: i64) -> Result<(), RedisError> {
        let mut conn = self.conn.clone();
        redis::cmd("ZADD")
            .arg(OFFER_EXPIRY_QUEUE_KEY)
            .arg(expires_at_epoch)
            .arg(offer_id.to_string())
            .query_async::<_, ()>(&mut conn)
            .await
    }

    /// Pop every entry with a deadline at or before `now_epoch`. The range
    /// read and the removal run in one MULTI/EXEC, so concurrent pollers
    /// never double-pop.
    pub async fn pop_due(&self, now_epoch: i64) -> Result<Vec<String>, RedisError> {
        let mut conn = self.conn.clone();
        let (due, _removed): (Vec<String>, i64) = redis::pipe()
            .atomic()
            .cmd("ZRANGEBYSCORE")
            .arg(OFFER_EXPIRY_QUEUE_KEY)
            .arg("-inf")
            .arg(now_epoch)
            .cmd("ZREMRANGEBYSCORE")
            .arg(OFFER_EXPIRY_QUEUE_KEY)
            .arg("-inf")
            .arg(now_epoch)
            .query_async(&mut conn)
            .await?;
        Ok(due)
    }
}
