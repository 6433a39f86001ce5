//! Offer expiry poller.
//!
//! Every second, pop due entries from the expiry queue and run each offer
//! through the matching engine's expiry path. When the queue in Redis is
//! unreachable the job degrades to scanning pending offers by deadline in
//! the database, so an offer never outlives `expires_at` by more than one
//! scan.

use chrono::Utc;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::config::MatchingConfig;
use crate::jobs::{Job, JobFrequency};
use crate::services::MatchingService;
use domain::events::EventBus;
use persistence::cache::OfferExpiryQueue;
use persistence::repositories::OfferRepository;

/// Polls the offer expiry queue.
pub struct OfferExpiryJob {
    matching: MatchingService,
    queue: OfferExpiryQueue,
    offers: OfferRepository,
}

impl OfferExpiryJob {
    pub fn new(
        pool: PgPool,
        redis: ConnectionManager,
        events: Arc<dyn EventBus>,
        config: MatchingConfig,
    ) -> Self {
        Self {
            matching: MatchingService::new(pool.clone(), redis.clone(), events, config),
            queue: OfferExpiryQueue::new(redis),
            offers: OfferRepository::new(pool),
        }
    }

    /// Offer ids due for expiry: the Redis queue when it answers, a
    /// database deadline scan otherwise.
    async fn due_offer_ids(&self) -> Result<Vec<Uuid>, String> {
        let now = Utc::now();
        match self.queue.pop_due(now.timestamp()).await {
            Ok(due) => Ok(due
                .into_iter()
                .filter_map(|raw| match Uuid::parse_str(&raw) {
                    Ok(id) => Some(id),
                    Err(_) => {
                        warn!(entry = %raw, "Discarding malformed expiry queue entry");
                        None
                    }
                })
                .collect()),
            Err(err) => {
                warn!(error = %err, "Expiry queue unavailable, scanning offer deadlines");
                self.offers
                    .expired_pending_ids(now)
                    .await
                    .map_err(|e| e.to_string())
            }
        }
    }
}

#[async_trait::async_trait]
impl Job for OfferExpiryJob {
    fn name(&self) -> &'static str {
        "offer_expiry"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(1)
    }

    async fn execute(&self) -> Result<(), String> {
        let due = self.due_offer_ids().await?;

        for offer_id in due {
            // One bad offer must not kill the poller.
            if let Err(err) = self.matching.handle_offer_expired(offer_id).await {
                error!(offer_id = %offer_id, error = %err, "Failed to expire offer");
            }
        }
        Ok(())
    }
}
