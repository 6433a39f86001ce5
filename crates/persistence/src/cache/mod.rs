//! Redis-backed caches and coordination structures.
//!
//! Everything here is derived or volatile state: losing it degrades
//! matching, surge, and expiry but never the database invariants.

pub mod driver_location;
pub mod idempotency;
pub mod offer_expiry;
pub mod ride_cache;

pub use driver_location::{DriverLocationCache, NearbyDriver};
pub use idempotency::IdempotencyCache;
pub use offer_expiry::OfferExpiryQueue;
pub use ride_cache::RideCache;
