//! Rate limiting middleware.
//!
//! Redis-backed sliding window, keyed per client IP. Requests inside the
//! window are tracked in a sorted set scored by timestamp; entries older
//! than the window are pruned on each request. When Redis is unreachable
//! the limiter fails open.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::AppState;
use crate::error::ApiError;
use domain::error::DispatchError;

/// Per-IP sliding-window rate limiter.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let limit = state.config.security.rate_limit_max_requests;
    if limit == 0 {
        return next.run(req).await;
    }

    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let window = state.config.security.rate_limit_window_secs;
    let key = format!("ratelimit:{client_ip}");
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let now_secs = now.as_secs_f64();
    let window_start = now_secs - window as f64;

    let mut conn = state.redis.clone();
    let result: Result<((), i64, (), ()), redis::RedisError> = redis::pipe()
        .cmd("ZREMRANGEBYSCORE")
        .arg(&key)
        .arg(0)
        .arg(window_start)
        .cmd("ZCARD")
        .arg(&key)
        .cmd("ZADD")
        .arg(&key)
        .arg(now_secs)
        .arg(now.as_micros() as u64)
        .cmd("EXPIRE")
        .arg(&key)
        .arg(window)
        .query_async(&mut conn)
        .await;

    match result {
        Ok((_, request_count, _, _)) => {
            if request_count as u64 >= limit {
                tracing::warn!(client_ip = %client_ip, "Rate limit exceeded");
                return ApiError::from(DispatchError::RateLimitExceeded).into_response();
            }
            next.run(req).await
        }
        Err(err) => {
            // Redis down: let the request through rather than refuse traffic.
            tracing::warn!(error = %err, "Rate limiter unavailable, failing open");
            next.run(req).await
        }
    }
}
