//! HTTP error mapping
//!
//! Handlers return `Result<T, ApiError>`. Caller-facing errors keep their
//! message; anything unclassified is logged in full and answered with a
//! generic 500 so storage or provider details never reach clients.

use crate::error::TownchatError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Error returned by every HTTP handler
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(TownchatError::BadRequest(message.into()).into())
    }

    /// Status code and client-facing message for this error
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self.0.downcast_ref::<TownchatError>() {
            Some(e @ TownchatError::NotFound(_)) => (StatusCode::NOT_FOUND, e.to_string()),
            Some(e @ TownchatError::BadRequest(_)) => (StatusCode::BAD_REQUEST, e.to_string()),
            Some(e @ TownchatError::ChatbotInactive(_)) => (StatusCode::FORBIDDEN, e.to_string()),
            Some(e @ (TownchatError::ChatbotMisconfigured(_) | TownchatError::Conflict(_))) => {
                (StatusCode::CONFLICT, e.to_string())
            }
            Some(TownchatError::ResponseGeneration(_)) => (
                StatusCode::BAD_GATEWAY,
                "Failed to generate a response".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "Request failed");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
