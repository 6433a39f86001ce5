//! Idempotency record entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the idempotency_keys table.
///
/// `(key, endpoint)` is unique; the row certifies the response that was
/// returned for that request.
#[derive(Debug, Clone, FromRow)]
pub struct IdempotencyKeyEntity {
    pub id: i64,
    pub key: String,
    pub endpoint: String,
    pub response_code: i32,
    pub response_body: Option<serde_json::Value>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
