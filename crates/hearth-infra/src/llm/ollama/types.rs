//! Ollama `/api/chat` streaming wire types.
//!
//! The request body is `hearth_types::llm::ChatRequest` serialized as-is; only
//! the response side needs its own shape here.

use serde::Deserialize;

/// One newline-delimited JSON object of a streamed chat reply.
///
/// Every field is optional on the wire: the final object usually carries only
/// `done: true` plus timing stats, which are ignored.
#[derive(Debug, Deserialize)]
pub struct OllamaChatChunk {
    #[serde(default)]
    pub message: Option<OllamaChunkMessage>,
    #[serde(default)]
    pub done: bool,
    /// Set when the server fails after the stream has started.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OllamaChunkMessage {
    #[serde(default)]
    pub content: String,
}
