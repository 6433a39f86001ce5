//! Hourly purge of expired idempotency records.

use sqlx::PgPool;
use tracing::info;

use crate::jobs::{Job, JobFrequency};
use persistence::repositories::IdempotencyKeyRepository;

/// Deletes idempotency rows past their expiry.
pub struct IdempotencyCleanupJob {
    repository: IdempotencyKeyRepository,
}

impl IdempotencyCleanupJob {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: IdempotencyKeyRepository::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl Job for IdempotencyCleanupJob {
    fn name(&self) -> &'static str {
        "idempotency_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), String> {
        let deleted = self
            .repository
            .delete_expired()
            .await
            .map_err(|e| e.to_string())?;
        if deleted > 0 {
            info!(deleted, "Purged expired idempotency records");
        }
        Ok(())
    }
}
