//! HTTP error mapping.
//!
//! Core services raise [`DispatchError`] variants; this type lifts them,
//! plus database and cache faults, into HTTP responses without translating
//! one kind into another.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain::error::DispatchError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Dispatch(err) => match err {
                DispatchError::RideNotFound(_)
                | DispatchError::DriverNotFound(_)
                | DispatchError::TripNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                DispatchError::InvalidStateTransition { .. } => {
                    (StatusCode::CONFLICT, "invalid_state_transition")
                }
                DispatchError::DriverUnavailable(_) => (StatusCode::CONFLICT, "driver_unavailable"),
                DispatchError::DuplicateRequest(_) => (StatusCode::CONFLICT, "duplicate_request"),
                DispatchError::Payment(_) => (StatusCode::PAYMENT_REQUIRED, "payment_error"),
                DispatchError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            },
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::Database(sqlx::Error::RowNotFound) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Database(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some("23505") =>
            {
                (StatusCode::CONFLICT, "conflict")
            }
            ApiError::Database(_) | ApiError::Cache(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Internal error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    format!(
                        "{}: {}",
                        field,
                        e.message.as_ref().map(|m| m.to_string()).unwrap_or_default()
                    )
                })
            })
            .collect();

        ApiError::Validation(details.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_of(err: ApiError) -> StatusCode {
        err.status_and_code().0
    }

    #[test]
    fn test_not_found_mapping() {
        assert_eq!(
            status_of(DispatchError::RideNotFound(Uuid::new_v4()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DispatchError::DriverNotFound(Uuid::new_v4()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DispatchError::TripNotFound(Uuid::new_v4()).into()),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_conflict_mapping() {
        assert_eq!(
            status_of(DispatchError::invalid_transition("completed", "matching").into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DispatchError::DriverUnavailable("taken".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DispatchError::DuplicateRequest("key".into()).into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_payment_and_rate_limit_mapping() {
        assert_eq!(
            status_of(DispatchError::Payment("trip not completed".into()).into()),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(DispatchError::RateLimitExceeded.into()),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_validation_mapping() {
        assert_eq!(
            status_of(ApiError::Validation("lat out of range".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_database_row_not_found_maps_to_404() {
        assert_eq!(
            status_of(ApiError::Database(sqlx::Error::RowNotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_unexpected_fault_maps_to_500() {
        assert_eq!(
            status_of(ApiError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
