//! API error responses.
//!
//! # Responsibilities
//! - Map bounded-operation and store failures to HTTP status codes
//! - Keep client-facing messages generic; details go to the log only

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::content::StoreError;
use crate::resilience::OperationError;

/// Error returned by route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("operation timed out")]
    Timeout,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Wire shape of an [`ApiError`].
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Timeout => ErrorBody {
                code: "TIMEOUT",
                message: "The request took too long to process. Please try again.",
            },
            ApiError::NotFound(_) => ErrorBody {
                code: "NOT_FOUND",
                message: "The requested resource was not found.",
            },
            ApiError::Internal(_) => ErrorBody {
                code: "INTERNAL_ERROR",
                message: "An unexpected error occurred. Please try again later.",
            },
        }
    }
}

impl From<OperationError<StoreError>> for ApiError {
    fn from(err: OperationError<StoreError>) -> Self {
        match err {
            OperationError::Timeout(_) => ApiError::Timeout,
            OperationError::Failed(e) if e.is_not_found() => ApiError::NotFound(e.to_string()),
            OperationError::Failed(e) => ApiError::Internal(e.to_string()),
            OperationError::Panicked(msg) => ApiError::Internal(format!("panic: {}", msg)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Timeout => tracing::warn!(error = %self, "Content read timed out"),
            ApiError::NotFound(_) => tracing::info!(error = %self, "Resource not found"),
            ApiError::Internal(_) => tracing::error!(error = %self, "Content read failed"),
        }
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_timeout_maps_to_408() {
        let err = ApiError::from(OperationError::<StoreError>::Timeout(Duration::from_millis(5)));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body["code"], "TIMEOUT");
    }

    #[tokio::test]
    async fn test_not_found_maps_to_404() {
        let err = ApiError::from(OperationError::Failed(StoreError::NotFound("contact")));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_internal_errors_do_not_leak_details() {
        let err = ApiError::from(OperationError::<StoreError>::Panicked(
            "connection string postgres://secret".to_string(),
        ));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("secret"));
    }
}
