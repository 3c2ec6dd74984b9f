//! munch-server/src/error.rs
//!
//! HTTP mapping for service errors. Bodies are `{"error": "<message>"}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use munch_core::Error;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("missing or malformed x-user-id header")]
    Unauthenticated,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Service(#[from] Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedPayload(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::MalformedPayload(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::MalformedPayload(rejection.body_text())
    }
}

pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::InvalidInput(_) | Error::Parse(_) | Error::Uuid(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::NotOwner { .. } => StatusCode::FORBIDDEN,
        Error::AlreadyUsed(_) => StatusCode::CONFLICT,
        Error::InsufficientPoints { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::LedgerUnavailable(_) | Error::Transient(_) | Error::Timeout(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        Error::RedemptionFailed { compensated: true, .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Service(err) => {
                let status = status_for(err);
                if status.is_server_error() {
                    error!(error = %err, "request failed");
                } else {
                    warn!(error = %err, "request rejected");
                }
                (status, err.user_message())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
