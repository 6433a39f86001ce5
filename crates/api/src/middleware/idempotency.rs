//! Idempotent response replay for POST requests.
//!
//! When a POST carries an `Idempotency-Key` header, the first 2xx JSON
//! response is cached in Redis under `idemp:{key}:{path}` and replayed for
//! later duplicates with an `x-idempotent-replay: true` marker. Non-JSON
//! responses pass through unchanged and are not cached.

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::extractors::idempotency_key::IDEMPOTENCY_KEY_HEADER;

/// Seconds a cached response stays replayable.
const REPLAY_TTL_SECS: u64 = 3600;

/// Largest response body the middleware will buffer for caching.
const MAX_CACHED_BODY_BYTES: usize = 1_048_576;

const REPLAY_MARKER_HEADER: &str = "x-idempotent-replay";

#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    status_code: u16,
    body: serde_json::Value,
}

/// Replay cached responses for POSTs bearing an idempotency key.
pub async fn idempotency_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() != Method::POST {
        return next.run(req).await;
    }

    let Some(key) = req
        .headers()
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
    else {
        return next.run(req).await;
    };

    let path = req.uri().path().to_string();
    let cache_key = format!("idemp:{key}:{path}");
    let mut conn = state.redis.clone();

    // Replay a previously cached response if one exists.
    let cached: Result<Option<String>, redis::RedisError> = redis::cmd("GET")
        .arg(&cache_key)
        .query_async(&mut conn)
        .await;
    if let Ok(Some(raw)) = cached {
        if let Ok(cached) = serde_json::from_str::<CachedResponse>(&raw) {
            let status =
                StatusCode::from_u16(cached.status_code).unwrap_or(StatusCode::OK);
            let mut response = (status, Json(cached.body)).into_response();
            response
                .headers_mut()
                .insert(REPLAY_MARKER_HEADER, HeaderValue::from_static("true"));
            return response;
        }
    }

    let response = next.run(req).await;

    // Only 2xx responses are cacheable.
    if !response.status().is_success() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(error = %err, "Failed to buffer response for idempotency cache");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Ok(body_json) = serde_json::from_slice::<serde_json::Value>(&bytes) {
        let entry = CachedResponse {
            status_code: parts.status.as_u16(),
            body: body_json,
        };
        match serde_json::to_string(&entry) {
            Ok(payload) => {
                let stored: Result<(), redis::RedisError> = redis::cmd("SET")
                    .arg(&cache_key)
                    .arg(payload)
                    .arg("EX")
                    .arg(REPLAY_TTL_SECS)
                    .query_async(&mut conn)
                    .await;
                if let Err(err) = stored {
                    tracing::warn!(error = %err, "Failed to cache idempotent response");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to serialize idempotent response");
            }
        }
    }
    // Non-JSON bodies fall through uncached.

    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_response_round_trip() {
        let entry = CachedResponse {
            status_code: 201,
            body: serde_json::json!({"id": "abc", "status": "succeeded"}),
        };
        let raw = serde_json::to_string(&entry).unwrap();
        let parsed: CachedResponse = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.status_code, 201);
        assert_eq!(parsed.body["status"], "succeeded");
    }
}
