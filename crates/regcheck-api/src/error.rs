//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps structural batch errors from regcheck-core to HTTP status codes.
//! Returns JSON error bodies of the form
//! `{"success": false, "error": {"code", "message"}}`.
//! Never exposes internal error details in responses.
//!
//! Per-item lookup failures never reach this type: they are folded into
//! each item's outcome and the request still succeeds. A panic outside the
//! per-item boundary is caught by [`panic_response`] and returned as a 500.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use regcheck_core::BatchError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "BAD_REQUEST", "SERVICE_NOT_READY").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request body missing, malformed, or missing a required field (400).
    #[error("{0}")]
    BadRequest(String),

    /// Batch endpoint received an empty list (400).
    #[error("{0}")]
    EmptyBatch(String),

    /// Batch endpoint received more identifiers than allowed (400).
    #[error("Batch size exceeds maximum limit of {limit}")]
    BatchTooLarge { limit: usize },

    /// Missing or invalid API key (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Client exceeded its request budget (429).
    #[error("rate limit exceeded, try again later")]
    RateLimited,

    /// Backing service not usable yet (503). Retryable by the caller.
    #[error("{0}")]
    ServiceNotReady(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::EmptyBatch(_) => (StatusCode::BAD_REQUEST, "EMPTY_BATCH"),
            Self::BatchTooLarge { .. } => (StatusCode::BAD_REQUEST, "BATCH_TOO_LARGE"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            Self::ServiceNotReady(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_NOT_READY"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Construct a service-not-ready error (503).
    pub fn not_ready(msg: &str) -> Self {
        Self::ServiceNotReady(msg.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Response for a handler that panicked, used with `CatchPanicLayer::custom`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}

/// Convert structural batch errors to API errors.
impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::EmptyBatch => Self::EmptyBatch(err.to_string()),
            BatchError::BatchTooLarge { limit, .. } => Self::BatchTooLarge { limit },
        }
    }
}
