//! Background job scheduler and job implementations.

mod idempotency_cleanup;
mod offer_expiry;
mod scheduler;

pub use idempotency_cleanup::IdempotencyCleanupJob;
pub use offer_expiry::OfferExpiryJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
