//! Core dispatch services.

pub mod driver;
pub mod matching;
pub mod payment;
pub mod ride;
pub mod surge;
pub mod trip;

pub use driver::DriverService;
pub use matching::MatchingService;
pub use payment::PaymentService;
pub use ride::RideService;
pub use surge::SurgeService;
pub use trip::TripService;
