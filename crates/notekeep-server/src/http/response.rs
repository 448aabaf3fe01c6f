//! JSON response envelope and error rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error};

use crate::service::ServiceError;

/// Every response body: `{success, message?, data?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    #[serde(skip)]
    status: StatusCode,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl ApiResponse {
    pub const fn ok(data: serde_json::Value) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub const fn created(data: serde_json::Value) -> Self {
        Self {
            status: StatusCode::CREATED,
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// A successful response carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    /// A successful response with an empty body envelope.
    pub const fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: None,
            data: None,
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Message shown for any token verification failure.
pub const INVALID_TOKEN_MESSAGE: &str = "not valid token";

/// The client-facing message for a service error.
///
/// Token failures share one message. Storage and internal failures are
/// logged and replaced by a generic message.
pub fn public_message(err: &ServiceError) -> String {
    match err {
        e if e.is_token_error() => {
            debug!(reason = %e, "Token rejected");
            INVALID_TOKEN_MESSAGE.to_string()
        }
        ServiceError::Persistence(e) => {
            error!(error = %e, "Storage failure");
            "storage operation failed".to_string()
        }
        ServiceError::Internal(e) => {
            error!(error = %e, "Internal failure");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiResponse::error(status, public_message(&self)).into_response()
    }
}
