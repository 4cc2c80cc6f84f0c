//! Message handlers.
//!
//! Endpoint:
//! - DELETE /api/messages/{id} - Delete one of the caller's messages

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use hearth_core::conversation::store::ConversationStore;

use crate::http::error::AppError;
use crate::http::extractors::identity::Identity;
use crate::http::handlers::conversation::parse_uuid;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// DELETE /api/messages/{id}
pub async fn delete_message(
    State(state): State<AppState>,
    Identity(owner_id): Identity,
    Path(message_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let id = parse_uuid(&message_id)?;

    if !state.store.delete_message(&id, &owner_id).await? {
        return Err(AppError::NotFound("Message not found".to_string()));
    }

    tracing::info!(message_id = %id, "message deleted");

    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": true }),
        request_id,
        start,
    )))
}
