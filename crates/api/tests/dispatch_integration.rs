//! End-to-end dispatch scenarios against real Postgres and Redis.
//!
//! Every test is self-contained: it seeds its own rider and drivers and
//! keeps its coordinates far away from the other tests so geo searches
//! never see a neighbour's drivers.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use common::{
    driver_status, ping_location, ride_status, seed_driver, seed_rider, send_json, setup,
};
use dispatch_api::config::MatchingConfig;
use dispatch_api::services::surge::zone_key;
use dispatch_api::services::MatchingService;
use domain::events::NoopEventBus;

/// Reset the geo set for a vehicle class and the surge keys of one zone.
/// Used by the test that asserts an exact surge multiplier, so re-runs
/// against a dirty Redis stay deterministic.
async fn reset_zone(ctx: &common::TestContext, vehicle: &str, lat: f64, lng: f64) {
    let mut conn = ctx.redis.clone();
    let zone = zone_key(lat, lng);
    let _: () = redis::pipe()
        .cmd("DEL")
        .arg(format!("drivers:geo:{vehicle}"))
        .ignore()
        .cmd("DEL")
        .arg(format!("surge:demand:{zone}"))
        .ignore()
        .cmd("DEL")
        .arg(format!("surge:multiplier:{zone}"))
        .ignore()
        .query_async(&mut conn)
        .await
        .expect("Failed to reset zone");
}

async fn create_ride(
    ctx: &common::TestContext,
    rider_id: Uuid,
    pickup: (f64, f64),
    dest: (f64, f64),
    vehicle: &str,
) -> (StatusCode, serde_json::Value) {
    send_json(
        &ctx.app,
        "POST",
        "/v1/rides",
        Some(json!({
            "rider_id": rider_id,
            "pickup_lat": pickup.0,
            "pickup_lng": pickup.1,
            "dest_lat": dest.0,
            "dest_lng": dest.1,
            "vehicle_type": vehicle,
            "payment_method": "cash",
        })),
        None,
    )
    .await
}

async fn accept(
    ctx: &common::TestContext,
    driver_id: Uuid,
    ride_id: &str,
    accept: bool,
) -> (StatusCode, serde_json::Value) {
    send_json(
        &ctx.app,
        "POST",
        &format!("/v1/drivers/{driver_id}/accept"),
        Some(json!({"ride_id": ride_id, "accept": accept})),
        None,
    )
    .await
}

#[tokio::test]
async fn test_happy_path_match_and_complete() {
    let Some(ctx) = setup().await else { return };

    let rider = seed_rider(&ctx.pool).await;
    let driver = seed_driver(&ctx.pool, "Asha", "mini").await;
    reset_zone(&ctx, "mini", 12.9716, 77.5946).await;
    ping_location(&ctx.app, driver, 12.9716, 77.5946).await;

    let (status, ride) = create_ride(
        &ctx,
        rider,
        (12.9716, 77.5946),
        (12.9352, 77.6245),
        "mini",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ride["status"], "offered");
    assert_eq!(ride["offers_made"], 1);
    assert_eq!(ride["surge_multiplier"], "1.00");
    assert_eq!(driver_status(&ctx.pool, driver).await, "busy");

    let ride_id = ride["id"].as_str().unwrap().to_string();
    let (status, ride) = accept(&ctx, driver, &ride_id, true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ride["status"], "accepted");
    assert_eq!(ride["matched_driver_id"].as_str(), Some(driver.to_string().as_str()));
    assert_eq!(driver_status(&ctx.pool, driver).await, "on_trip");

    let (status, trip) = send_json(
        &ctx.app,
        "POST",
        &format!("/v1/trips/{ride_id}/start"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trip["status"], "in_progress");
    let trip_id = trip["id"].as_str().unwrap().to_string();

    let (status, trip) = send_json(
        &ctx.app,
        "POST",
        &format!("/v1/trips/{trip_id}/end"),
        Some(json!({"distance_m": 5000, "duration_s": 1200})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trip["status"], "completed");
    assert_eq!(trip["base_fare"], "40.00");
    assert_eq!(trip["distance_fare"], "50.00");
    assert_eq!(trip["time_fare"], "30.00");
    assert_eq!(trip["total_fare"], "120.00");
    assert_eq!(ride_status(&ctx.pool, ride["id"].as_str().unwrap().parse().unwrap()).await, "completed");
    assert_eq!(driver_status(&ctx.pool, driver).await, "available");

    let (status, payment) = send_json(
        &ctx.app,
        "POST",
        "/v1/payments",
        Some(json!({"trip_id": trip_id, "payment_method": "cash"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["status"], "succeeded");
    assert_eq!(payment["amount"], "120.00");
}

#[tokio::test]
async fn test_decline_requeues_next_driver() {
    let Some(ctx) = setup().await else { return };

    let rider = seed_rider(&ctx.pool).await;
    let close = seed_driver(&ctx.pool, "Near", "sedan").await;
    let far = seed_driver(&ctx.pool, "Far", "sedan").await;
    ping_location(&ctx.app, close, 28.6100, 77.2100).await;
    ping_location(&ctx.app, far, 28.6180, 77.2100).await;

    let (status, ride) = create_ride(&ctx, rider, (28.6100, 77.2100), (28.6500, 77.2500), "sedan").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ride["status"], "offered");
    // Closest driver is offered first.
    assert_eq!(driver_status(&ctx.pool, close).await, "busy");
    assert_eq!(driver_status(&ctx.pool, far).await, "available");

    let ride_id = ride["id"].as_str().unwrap().to_string();
    let (status, ride) = accept(&ctx, close, &ride_id, false).await;
    assert_eq!(status, StatusCode::OK);

    // Declined driver is released immediately, the next candidate holds
    // the new offer.
    assert_eq!(driver_status(&ctx.pool, close).await, "available");
    assert_eq!(driver_status(&ctx.pool, far).await, "busy");
    assert_eq!(ride["status"], "offered");
    assert_eq!(ride["offers_made"], 2);
}

#[tokio::test]
async fn test_max_offers_exhausted_terminates_in_no_drivers() {
    let Some(ctx) = setup().await else { return };

    let rider = seed_rider(&ctx.pool).await;
    let driver = seed_driver(&ctx.pool, "Only", "suv").await;
    ping_location(&ctx.app, driver, 19.0700, 72.8700).await;

    let (status, ride) = create_ride(&ctx, rider, (19.0700, 72.8700), (19.1000, 72.9000), "suv").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ride["status"], "offered");
    let ride_id = ride["id"].as_str().unwrap().to_string();

    sqlx::query("UPDATE ride_requests SET max_offers = 1 WHERE id = $1")
        .bind(ride_id.parse::<Uuid>().unwrap())
        .execute(&ctx.pool)
        .await
        .unwrap();

    let (status, ride) = accept(&ctx, driver, &ride_id, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ride["status"], "no_drivers");
    assert_eq!(driver_status(&ctx.pool, driver).await, "available");
}

#[tokio::test]
async fn test_expired_offer_releases_driver_and_rematches() {
    let Some(ctx) = setup().await else { return };

    let rider = seed_rider(&ctx.pool).await;
    let first = seed_driver(&ctx.pool, "First", "auto").await;
    let second = seed_driver(&ctx.pool, "Second", "auto").await;
    ping_location(&ctx.app, first, 13.0800, 80.2700).await;
    ping_location(&ctx.app, second, 13.0850, 80.2700).await;

    let (status, ride) = create_ride(&ctx, rider, (13.0800, 80.2700), (13.1000, 80.3000), "auto").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(driver_status(&ctx.pool, first).await, "busy");
    let ride_id: Uuid = ride["id"].as_str().unwrap().parse().unwrap();

    let offer_id = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM ride_offers WHERE ride_id = $1 AND driver_id = $2",
    )
    .bind(ride_id)
    .bind(first)
    .fetch_one(&ctx.pool)
    .await
    .unwrap();

    // Drive the expiry path directly instead of waiting out the TTL.
    let matching = MatchingService::new(
        ctx.pool.clone(),
        ctx.redis.clone(),
        Arc::new(NoopEventBus),
        MatchingConfig::default(),
    );
    matching.handle_offer_expired(offer_id).await.unwrap();

    let offer_status = sqlx::query_scalar::<_, String>(
        "SELECT status FROM ride_offers WHERE id = $1",
    )
    .bind(offer_id)
    .fetch_one(&ctx.pool)
    .await
    .unwrap();
    assert_eq!(offer_status, "expired");
    assert_eq!(driver_status(&ctx.pool, first).await, "available");
    // The excluded first driver is skipped; the second now holds the offer.
    assert_eq!(driver_status(&ctx.pool, second).await, "busy");
    assert_eq!(ride_status(&ctx.pool, ride_id).await, "offered");

    // Replays are no-ops.
    matching.handle_offer_expired(offer_id).await.unwrap();
    assert_eq!(driver_status(&ctx.pool, second).await, "busy");
}

#[tokio::test]
async fn test_payment_idempotency() {
    let Some(ctx) = setup().await else { return };

    let rider = seed_rider(&ctx.pool).await;
    let driver = seed_driver(&ctx.pool, "Payee", "auto").await;
    ping_location(&ctx.app, driver, 17.3800, 78.4800).await;

    let (_, ride) = create_ride(&ctx, rider, (17.3800, 78.4800), (17.4000, 78.5000), "auto").await;
    let ride_id = ride["id"].as_str().unwrap().to_string();
    accept(&ctx, driver, &ride_id, true).await;
    let (_, trip) = send_json(&ctx.app, "POST", &format!("/v1/trips/{ride_id}/start"), None, None).await;
    let trip_id = trip["id"].as_str().unwrap().to_string();
    send_json(
        &ctx.app,
        "POST",
        &format!("/v1/trips/{trip_id}/end"),
        Some(json!({"distance_m": 3000, "duration_s": 600})),
        None,
    )
    .await;

    let key = format!("pay-{}", Uuid::new_v4());
    let body = json!({"trip_id": trip_id, "payment_method": "card"});

    let (status, first) = send_json(&ctx.app, "POST", "/v1/payments", Some(body.clone()), Some(&key)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["status"], "succeeded");
    assert!(first["psp_transaction_id"].as_str().unwrap().starts_with("psp_"));

    // Same key again: either a replay of the original response or an
    // explicit duplicate rejection.
    let (status, second) = send_json(&ctx.app, "POST", "/v1/payments", Some(body), Some(&key)).await;
    match status {
        StatusCode::CREATED => assert_eq!(second["id"], first["id"]),
        StatusCode::CONFLICT => assert_eq!(second["error"], "duplicate_request"),
        other => panic!("unexpected status: {other}"),
    }

    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM payments WHERE trip_id = $1 AND status IN ('processing', 'succeeded')",
    )
    .bind(trip_id.parse::<Uuid>().unwrap())
    .fetch_one(&ctx.pool)
    .await
    .unwrap();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn test_cancel_after_accept_releases_driver() {
    let Some(ctx) = setup().await else { return };

    let rider = seed_rider(&ctx.pool).await;
    let driver = seed_driver(&ctx.pool, "Canc", "sedan").await;
    ping_location(&ctx.app, driver, 18.5200, 73.8500).await;

    let (_, ride) = create_ride(&ctx, rider, (18.5200, 73.8500), (18.5500, 73.9000), "sedan").await;
    let ride_id = ride["id"].as_str().unwrap().to_string();
    accept(&ctx, driver, &ride_id, true).await;

    let (status, ride) = send_json(
        &ctx.app,
        "POST",
        &format!("/v1/rides/{ride_id}/cancel"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ride["status"], "cancelled");
    assert_eq!(driver_status(&ctx.pool, driver).await, "available");

    // Terminal rides cannot be cancelled again.
    let (status, body) = send_json(
        &ctx.app,
        "POST",
        &format!("/v1/rides/{ride_id}/cancel"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state_transition");
}

#[tokio::test]
async fn test_get_missing_resources_return_404() {
    let Some(ctx) = setup().await else { return };

    let missing = Uuid::new_v4();
    let (status, _) = send_json(&ctx.app, "GET", &format!("/v1/rides/{missing}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send_json(&ctx.app, "GET", &format!("/v1/trips/{missing}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send_json(&ctx.app, "GET", &format!("/v1/drivers/{missing}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
