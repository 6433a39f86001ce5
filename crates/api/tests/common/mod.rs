//! Common test utilities for integration tests.
//!
//! These tests exercise the full stack against real Postgres and Redis
//! instances. They are skipped unless both `TEST_DATABASE_URL` and
//! `TEST_REDIS_URL` are set.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use dispatch_api::app::create_app;
use dispatch_api::config::{
    Config, DatabaseConfig, LoggingConfig, MatchingConfig, RedisConfig, SecurityConfig,
    ServerConfig, SurgeConfig,
};
use dispatch_api::ws;

pub struct TestContext {
    pub app: Router,
    pub pool: PgPool,
    pub redis: ConnectionManager,
}

/// Build the full application against the test database and Redis, or
/// `None` when the environment does not provide them.
pub async fn setup() -> Option<TestContext> {
    let (Ok(database_url), Ok(redis_url)) = (
        std::env::var("TEST_DATABASE_URL"),
        std::env::var("TEST_REDIS_URL"),
    ) else {
        eprintln!("Skipping integration test: TEST_DATABASE_URL / TEST_REDIS_URL not set");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let redis = persistence::kv::create_connection(&persistence::kv::RedisConfig {
        url: redis_url.clone(),
    })
    .await
    .expect("Failed to connect to test Redis");

    let config = test_config(&database_url, &redis_url);
    let events = Arc::new(ws::ConnectionManager::new());
    let app = create_app(config, pool.clone(), redis.clone(), events);

    Some(TestContext { app, pool, redis })
}

/// Test configuration: rate limiting off, everything else at defaults.
pub fn test_config(database_url: &str, redis_url: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            url: database_url.to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        redis: RedisConfig {
            url: redis_url.to_string(),
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            cors_origins: Vec::new(),
            rate_limit_window_secs: 60,
            rate_limit_max_requests: 0,
        },
        matching: MatchingConfig::default(),
        surge: SurgeConfig::default(),
    }
}

/// Insert a rider row and return its id.
pub async fn seed_rider(pool: &PgPool) -> Uuid {
    let email = format!("rider-{}@example.com", Uuid::new_v4());
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO riders (name, email) VALUES ('Test Rider', $1) RETURNING id",
    )
    .bind(email)
    .fetch_one(pool)
    .await
    .expect("Failed to seed rider")
}

/// Insert an available driver row and return its id.
pub async fn seed_driver(pool: &PgPool, name: &str, vehicle: &str) -> Uuid {
    let email = format!("driver-{}@example.com", Uuid::new_v4());
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO drivers (name, email, vehicle_type, status) \
         VALUES ($1, $2, $3, 'available') RETURNING id",
    )
    .bind(name)
    .bind(email)
    .bind(vehicle)
    .fetch_one(pool)
    .await
    .expect("Failed to seed driver")
}

/// Issue a request and return (status, parsed JSON body).
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
    idempotency_key: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = idempotency_key {
        builder = builder.header("idempotency-key", key);
    }
    let request = builder
        .body(match body {
            Some(json) => Body::from(json.to_string()),
            None => Body::empty(),
        })
        .expect("Failed to build request");

    let response = app.clone().oneshot(request).await.expect("Request failed");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

/// POST a driver location heartbeat through the API.
pub async fn ping_location(app: &Router, driver_id: Uuid, lat: f64, lng: f64) {
    let (status, _) = send_json(
        app,
        "POST",
        &format!("/v1/drivers/{driver_id}/location"),
        Some(serde_json::json!({"lat": lat, "lng": lng})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "location ping failed");
}

/// Current status string of a driver row.
pub async fn driver_status(pool: &PgPool, driver_id: Uuid) -> String {
    sqlx::query_scalar::<_, String>("SELECT status FROM drivers WHERE id = $1")
        .bind(driver_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read driver status")
}

/// Current status string of a ride row.
pub async fn ride_status(pool: &PgPool, ride_id: Uuid) -> String {
    sqlx::query_scalar::<_, String>("SELECT status FROM ride_requests WHERE id = $1")
        .bind(ride_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read ride status")
}
