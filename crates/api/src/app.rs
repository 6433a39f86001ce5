use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    idempotency_middleware, metrics_handler, metrics_middleware, rate_limit_middleware,
};
use crate::routes::{drivers, health, payments, rides, trips};
use crate::ws;
use domain::events::EventBus;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub redis: ConnectionManager,
    pub config: Arc<Config>,
    /// Sink the core publishes lifecycle events into.
    pub events: Arc<dyn EventBus>,
    /// The WebSocket fan-out behind `events`, for subscribe endpoints.
    pub ws: Arc<ws::ConnectionManager>,
}

pub fn create_app(
    config: Config,
    pool: PgPool,
    redis: ConnectionManager,
    ws_manager: Arc<ws::ConnectionManager>,
) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        pool,
        redis,
        config: config.clone(),
        events: ws_manager.clone(),
        ws: ws_manager,
    };

    // Specific origins when configured, permissive otherwise.
    let cors = if config.security.cors_origins.is_empty()
        || config.security.cors_origins.iter().any(|o| o == "*")
    {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let v1 = Router::new()
        .route("/rides", post(rides::create_ride).get(rides::list_rides))
        .route("/rides/:id", get(rides::get_ride))
        .route("/rides/:id/cancel", post(rides::cancel_ride))
        .route("/drivers", get(drivers::list_drivers))
        .route("/drivers/:id", get(drivers::get_driver))
        .route("/drivers/:id/location", post(drivers::update_location))
        .route("/drivers/:id/accept", post(drivers::accept_ride))
        .route("/trips/:id/start", post(trips::start_trip))
        .route("/trips/:id/end", post(trips::end_trip))
        .route("/trips/:id", get(trips::get_trip))
        .route("/payments", post(payments::create_payment));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics_handler))
        .route("/ws/dashboard", get(ws::handlers::ws_dashboard))
        .route("/ws/rides/:id", get(ws::handlers::ws_ride))
        .nest("/v1", v1)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            idempotency_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors)
        .layer(CompressionLayer::new())
        .with_state(state)
}
