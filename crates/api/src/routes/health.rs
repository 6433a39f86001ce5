//! Health check endpoint handlers.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub postgres: String,
    pub redis: String,
}

fn up_down(ok: bool) -> String {
    if ok { "up" } else { "down" }.to_string()
}

/// GET /health
///
/// `healthy` only when both Postgres and Redis answer a liveness probe;
/// `degraded` otherwise.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let pg_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let redis_ok = persistence::kv::ping(&state.redis).await;

    let status = if pg_ok && redis_ok {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        postgres: up_down(pg_ok),
        redis: up_down(redis_ok),
    })
}
