//! Inbound chat turn payloads.
//!
//! `SendMessageRequest` is deliberately loose (raw JSON values) so that a
//! wrongly-typed field is reported as a validation error by the relay
//! rather than as a deserialization rejection. `ChatTurn` is the validated
//! form the relay works with.

use serde::Deserialize;
use uuid::Uuid;

/// Raw body of `POST /api/chat`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: Option<serde_json::Value>,
    #[serde(default)]
    pub model: Option<serde_json::Value>,
    #[serde(default)]
    pub conversation_id: Option<serde_json::Value>,
}

/// A validated chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    /// The user utterance, already trimmed and non-empty.
    pub message: String,
    pub model: String,
    /// `None` starts a new conversation.
    pub conversation_id: Option<Uuid>,
}
