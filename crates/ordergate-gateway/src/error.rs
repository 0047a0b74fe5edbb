//! API error type and HTTP status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use ordergate_coordinator::SubmitError;
use ordergate_core::OrderId;
use ordergate_risk::RiskError;

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("insufficient permissions: {0}")]
    Forbidden(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("duplicate submission; original order {prior_order_id}")]
    Duplicate { prior_order_id: OrderId },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Validation(inner) => Self::Validation(inner.to_string()),
            SubmitError::Duplicate { prior_order_id } => Self::Duplicate { prior_order_id },
            SubmitError::Journal(inner) => Self::Internal(inner.to_string()),
        }
    }
}

impl From<RiskError> for ApiError {
    fn from(e: RiskError) -> Self {
        match e {
            RiskError::EmptyActor | RiskError::Config(_) => Self::Validation(e.to_string()),
            RiskError::Journal(inner) => Self::Internal(inner.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Duplicate { .. } => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "request rejected");
        }

        let body = match &self {
            Self::Duplicate { prior_order_id } => json!({
                "error": "DUPLICATE",
                "message": self.to_string(),
                "prior_order_id": prior_order_id,
            }),
            _ => json!({
                "error": status.canonical_reason().unwrap_or("error"),
                "message": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
