use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use dispatch_api::{app, config::Config, jobs, middleware, ws};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging);
    middleware::metrics::init_metrics();

    info!("Starting ride dispatch API v{}", env!("CARGO_PKG_VERSION"));

    // Database pool + migrations
    let db_config = persistence::db::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        connect_timeout_secs: config.database.connect_timeout_secs,
        idle_timeout_secs: config.database.idle_timeout_secs,
    };
    let pool = persistence::db::create_pool(&db_config).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    // Redis: geo index, caches, expiry queue
    let redis = persistence::kv::create_connection(&persistence::kv::RedisConfig {
        url: config.redis.url.clone(),
    })
    .await?;

    // Event fan-out shared by the HTTP surface and the background jobs
    let events = Arc::new(ws::ConnectionManager::new());

    // Background jobs: offer expiry poller + idempotency cleanup
    let mut scheduler = jobs::JobScheduler::new();
    scheduler.register(jobs::OfferExpiryJob::new(
        pool.clone(),
        redis.clone(),
        events.clone(),
        config.matching.clone(),
    ));
    scheduler.register(jobs::IdempotencyCleanupJob::new(pool.clone()));
    scheduler.start();

    let addr = config.socket_addr()?;
    let app = app::create_app(config, pool, redis, events);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    // Stop the expiry poller and friends cleanly
    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(30)).await;

    info!("Server shutdown complete");
    Ok(())
}
