//! Error-handling middleware.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::pipeline::error::PipelineError;
use crate::pipeline::exchange::Exchange;

/// Turns a chain-aborting error into a response.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: PipelineError, exchange: &Exchange) -> Response;
}

/// Answers with `PipelineError::status` and a small JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, error: PipelineError, exchange: &Exchange) -> Response {
        let status = error.status();
        let request_id = exchange.request_id().unwrap_or("unknown");
        if status.is_server_error() {
            tracing::error!(request_id = %request_id, status = %status, error = %error, "Request failed");
        } else {
            tracing::warn!(request_id = %request_id, status = %status, error = %error, "Request rejected");
        }

        let message = if status.is_server_error() {
            "internal error".to_string()
        } else {
            error.to_string()
        };
        (
            status,
            Json(json!({
                "error": status.canonical_reason().unwrap_or("error"),
                "message": message,
            })),
        )
            .into_response()
    }
}

/// Plain response for `Signal::Status`.
pub fn status_response(status: StatusCode) -> Response {
    (status, status.canonical_reason().unwrap_or_default()).into_response()
}
