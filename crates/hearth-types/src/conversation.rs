//! Conversation and message types for Hearth.
//!
//! A conversation is an owned, append-only transcript between one user and
//! the local model. Messages are ordered by `created_at` within it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-export MessageRole from llm module (it's used in both stored and wire contexts).
pub use crate::llm::MessageRole;

/// A conversation owned by a single identity.
///
/// Created with `title: None` on the first message of a new chat. The title
/// is set at most once, after the first assistant reply is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub owner_id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Build a fresh, untitled conversation for `owner_id`.
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            owner_id: owner_id.into(),
            title: None,
            created_at: Utc::now(),
        }
    }

    /// Whether a non-empty title has already been assigned.
    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// A single persisted message within a conversation.
///
/// Messages are never edited by the relay; it only appends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub owner_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a new message stamped with a fresh time-sortable id and `now`.
    pub fn new(
        conversation_id: Uuid,
        owner_id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            conversation_id,
            owner_id: owner_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Conversation listing entry returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Conversation> for ConversationSummary {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            title: c.title,
            created_at: c.created_at,
        }
    }
}
