//! Application error type mapping to HTTP status codes and envelope format.

use std::time::Instant;

use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use hearth_types::error::{RelayError, RepositoryError};
use hearth_types::llm::UpstreamError;

use crate::http::response::ApiResponse;

/// Non-standard status for a request the client abandoned before any
/// response was produced.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Failure reported by a relay session before streaming began.
    Relay(RelayError),
    Store(RepositoryError),
    /// No caller identity.
    Unauthorized(String),
    Validation(String),
    NotFound(String),
    PayloadTooLarge,
    /// Request body could not be read because the client went away.
    ClientClosed,
    Internal(String),
}

impl From<RelayError> for AppError {
    fn from(e: RelayError) -> Self {
        AppError::Relay(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Store(e)
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::ClientClosed
        }
    }
}

impl AppError {
    /// Status, machine code, message, and optional details for this error.
    fn parts(&self) -> (StatusCode, &'static str, String, Option<serde_json::Value>) {
        match self {
            AppError::Relay(RelayError::Validation(msg)) | AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
            AppError::Relay(RelayError::ConversationNotFound) => (
                StatusCode::NOT_FOUND,
                "CONVERSATION_NOT_FOUND",
                "Conversation not found".to_string(),
                None,
            ),
            AppError::Relay(RelayError::Store(e)) | AppError::Store(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_ERROR",
                e.to_string(),
                None,
            ),
            AppError::Relay(RelayError::Upstream(e)) => upstream_parts(e),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "Request body too large".to_string(),
                None,
            ),
            AppError::ClientClosed => (
                client_closed_status(),
                "CLIENT_CLOSED_REQUEST",
                "Request aborted by client".to_string(),
                None,
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
                None,
            ),
        }
    }
}

fn client_closed_status() -> StatusCode {
    StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Upstream failures before the first byte: a rejected request keeps the
/// model server's status, everything else is a gateway error.
fn upstream_parts(e: &UpstreamError) -> (StatusCode, &'static str, String, Option<serde_json::Value>) {
    match e {
        UpstreamError::Status { status, body } => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            "UPSTREAM_ERROR",
            format!("Model server returned HTTP {status}"),
            Some(serde_json::json!({ "upstream_body": body })),
        ),
        UpstreamError::Connect(msg) => (
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_UNAVAILABLE",
            format!("Model server unreachable: {msg}"),
            None,
        ),
        UpstreamError::DeadlineExceeded(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            "UPSTREAM_TIMEOUT",
            e.to_string(),
            None,
        ),
        UpstreamError::Cancelled => (
            client_closed_status(),
            "CLIENT_CLOSED_REQUEST",
            e.to_string(),
            None,
        ),
        UpstreamError::Stream(_) => (
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_ERROR",
            e.to_string(),
            None,
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "request failed");
        } else {
            tracing::debug!(status = %status, code, error = %message, "request rejected");
        }

        let body = ApiResponse::error(
            code,
            message,
            details,
            Uuid::now_v7().to_string(),
            Instant::now(),
        );

        (status, Json(body)).into_response()
    }
}
