//! HTTP middleware components.

pub mod idempotency;
pub mod logging;
pub mod metrics;
pub mod rate_limit;

pub use idempotency::idempotency_middleware;
pub use logging::init_logging;
pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use rate_limit::rate_limit_middleware;
