//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`mediarelay_core::Error`] so that route
//! handlers can return `Result<T, AppError>` directly. Every error reaches
//! the client as `{"error": "<public message>"}`; the detailed message
//! (exit status, stderr, parser position) only goes to the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: mediarelay_core::Error,
}

impl AppError {
    pub fn new(inner: mediarelay_core::Error) -> Self {
        Self { inner }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<mediarelay_core::Error> for AppError {
    fn from(e: mediarelay_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        } else {
            tracing::debug!(status = %status, error = %self.inner, "Rejected request");
        }

        let body = json!({ "error": self.inner.public_message() });

        (status, axum::Json(body)).into_response()
    }
}
