//! Conversation browsing handlers.
//!
//! Endpoints:
//! - GET /api/conversations               - List the caller's conversations
//! - GET /api/conversations/{id}/messages - Messages of one conversation

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use hearth_core::conversation::store::ConversationStore;
use hearth_types::conversation::{ConversationSummary, Message, MessageRole};

use crate::http::error::AppError;
use crate::http::extractors::identity::Identity;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Message as shown to the conversation's owner.
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageView {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            role: m.role,
            content: m.content,
            created_at: m.created_at,
        }
    }
}

/// Parse a UUID from a path parameter, returning a 400 error on invalid format.
pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid UUID: {s}")))
}

/// GET /api/conversations - Newest first.
pub async fn list_conversations(
    State(state): State<AppState>,
    Identity(owner_id): Identity,
) -> Result<Json<ApiResponse<Vec<ConversationSummary>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let conversations: Vec<ConversationSummary> = state
        .store
        .list_conversations(&owner_id)
        .await?
        .into_iter()
        .map(ConversationSummary::from)
        .collect();

    let resp = ApiResponse::success(conversations, request_id, start)
        .with_link("self", "/api/conversations");

    Ok(Json(resp))
}

/// GET /api/conversations/{id}/messages - Oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Identity(owner_id): Identity,
    Path(conversation_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<MessageView>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let id = parse_uuid(&conversation_id)?;

    // Another owner's conversation is indistinguishable from a missing one.
    state
        .store
        .get_conversation(&id)
        .await?
        .filter(|c| c.owner_id == owner_id)
        .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

    let messages: Vec<MessageView> = state
        .store
        .list_messages(&id)
        .await?
        .into_iter()
        .map(MessageView::from)
        .collect();

    let resp = ApiResponse::success(messages, request_id, start)
        .with_link("self", &format!("/api/conversations/{id}/messages"));

    Ok(Json(resp))
}
