//! Database entity definitions.
//!
//! Entities are direct mappings to database rows. Status columns are stored
//! as text and parsed into domain enums at the edges.

pub mod driver;
pub mod idempotency_key;
pub mod payment;
pub mod ride;
pub mod trip;

pub use driver::DriverEntity;
pub use idempotency_key::IdempotencyKeyEntity;
pub use payment::PaymentEntity;
pub use ride::{RideEntity, RideOfferEntity};
pub use trip::TripEntity;
