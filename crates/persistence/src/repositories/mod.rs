//! Repository implementations.
//!
//! Repositories own the SQL. Plain reads go through the pool; operations
//! that must share a transaction with other writes are associated functions
//! taking `&mut PgConnection`, so services compose them under one commit.

pub mod driver;
pub mod idempotency_key;
pub mod offer;
pub mod payment;
pub mod ride;
pub mod trip;

pub use driver::DriverRepository;
pub use idempotency_key::IdempotencyKeyRepository;
pub use offer::OfferRepository;
pub use payment::{NewPayment, PaymentRepository};
pub use ride::{NewRide, RideRepository};
pub use trip::TripRepository;
