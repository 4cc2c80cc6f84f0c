//! Streaming chat relay handler.
//!
//! Endpoint:
//! - POST /api/chat - Send one chat turn and stream the assistant reply
//!
//! Unlike the other endpoints the success response is not an envelope: it is
//! the raw assistant text, written as it arrives from the model server, with
//! the conversation id in the `X-Conversation-Id` header.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{StatusCode, header};
use axum::response::Response;
use futures_util::StreamExt;

use hearth_core::relay::session::RelayStream;
use hearth_types::chat::SendMessageRequest;

use crate::http::error::AppError;
use crate::http::extractors::identity::Identity;
use crate::state::AppState;

pub const CONVERSATION_ID_HEADER: &str = "x-conversation-id";

/// POST /api/chat - Relay one chat turn.
///
/// The body is parsed here rather than through `Json` so that a missing
/// content type is not an error and a wrongly-typed field is reported by
/// the relay's own validation.
pub async fn send_message(
    State(state): State<AppState>,
    Identity(owner_id): Identity,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let body = body?;
    let request: SendMessageRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid JSON body: {e}")))?;

    let RelayStream {
        conversation_id,
        body,
        task,
        ..
    } = state.relay.start(&owner_id, request).await?;

    // Detached: the session persists the reply on its own once the body is
    // finished or dropped.
    drop(task);

    tracing::debug!(conversation_id = %conversation_id, owner_id = %owner_id, "streaming reply");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-accel-buffering", "no")
        .header(CONVERSATION_ID_HEADER, conversation_id.to_string())
        .body(Body::from_stream(body.map(|chunk| chunk.map(Bytes::from))))
        .map_err(|e| AppError::Internal(format!("failed to build response: {e}")))
}
