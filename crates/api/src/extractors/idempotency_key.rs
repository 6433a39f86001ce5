//! Idempotency key header extractor.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use std::convert::Infallible;

/// The header name for idempotency keys.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Optional idempotency key extracted from request headers.
///
/// The raw key is used as-is: the Redis layout `idemp:{key}:{endpoint}` is
/// shared with other processes, so no hashing is applied.
#[derive(Debug, Clone)]
pub struct OptionalIdempotencyKey(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalIdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(OptionalIdempotencyKey(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> OptionalIdempotencyKey {
        let (mut parts, _) = request.into_parts();
        OptionalIdempotencyKey::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_present_header() {
        let request = Request::builder()
            .header(IDEMPOTENCY_KEY_HEADER, "pay-001")
            .body(())
            .unwrap();
        let key = extract(request).await;
        assert_eq!(key.0.as_deref(), Some("pay-001"));
    }

    #[tokio::test]
    async fn test_missing_header() {
        let request = Request::builder().body(()).unwrap();
        let key = extract(request).await;
        assert!(key.0.is_none());
    }

    #[tokio::test]
    async fn test_empty_header_treated_as_missing() {
        let request = Request::builder()
            .header(IDEMPOTENCY_KEY_HEADER, "")
            .body(())
            .unwrap();
        let key = extract(request).await;
        assert!(key.0.is_none());
    }
}
