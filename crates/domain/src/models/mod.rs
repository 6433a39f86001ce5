//! Domain models, status enums, and request/response DTOs.

pub mod driver;
pub mod payment;
pub mod ride;
pub mod trip;
pub mod vehicle;

pub use driver::{DriverAcceptRequest, DriverLocationUpdate, DriverResponse, DriverStatus};
pub use payment::{CreatePaymentRequest, PaymentMethod, PaymentResponse, PaymentStatus};
pub use ride::{CreateRideRequest, OfferStatus, RideOfferResponse, RideResponse, RideStatus};
pub use trip::{TripEndRequest, TripResponse, TripStatus};
pub use vehicle::VehicleClass;
