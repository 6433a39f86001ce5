//! Request extractors.

pub mod idempotency_key;

pub use idempotency_key::OptionalIdempotencyKey;
