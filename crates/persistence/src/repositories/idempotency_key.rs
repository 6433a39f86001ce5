//! Idempotency record repository for database operations.

use sqlx::{PgConnection, PgPool};

use crate::entities::IdempotencyKeyEntity;
use crate::metrics::QueryTimer;

const IDEMPOTENCY_COLUMNS: &str =
    "id, key, endpoint, response_code, response_body, expires_at, created_at";

/// Repository for the durable idempotency layer.
#[derive(Clone)]
pub struct IdempotencyKeyRepository {
    pool: PgPool,
}

impl IdempotencyKeyRepository {
    /// Creates a new IdempotencyKeyRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a non-expired record for `(key, endpoint)`.
    pub async fn find(
        &self,
        key: &str,
        endpoint: &str,
    ) -> Result<Option<IdempotencyKeyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_idempotency_key");

        let sql = format!(
            "SELECT {IDEMPOTENCY_COLUMNS} FROM idempotency_keys \
             WHERE key = $1 AND endpoint = $2 AND expires_at > NOW()"
        );
        let result = sqlx::query_as::<_, IdempotencyKeyEntity>(&sql)
            .bind(key)
            .bind(endpoint)
            .fetch_optional(&self.pool)
            .await;

        timer.record();
        result
    }

    /// Store the record certifying a response, alongside the write it
    /// certifies. Races on the same key resolve to the first writer.
    pub async fn store(
        conn: &mut PgConnection,
        key: &str,
        endpoint: &str,
        response_code: i32,
        response_body: serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO idempotency_keys (key, endpoint, response_code, response_body)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key, endpoint) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(endpoint)
        .bind(response_code)
        .bind(response_body)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Delete expired records. Returns the number of deleted rows.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM idempotency_keys WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
