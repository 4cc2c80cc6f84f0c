//! Upstream model request/response types for Hearth.
//!
//! These types model the data shapes exchanged with the local model server:
//! the chat request, sampling options, decoded stream frames, and errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in a model conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single entry of the prompt sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: MessageRole,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Sampling options forwarded verbatim to the model server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f64,
    #[serde(default = "default_presence_penalty")]
    pub presence_penalty: f64,
}

fn default_temperature() -> f64 {
    0.4
}

fn default_top_p() -> f64 {
    0.9
}

fn default_repeat_penalty() -> f64 {
    1.2
}

fn default_presence_penalty() -> f64 {
    0.6
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            repeat_penalty: default_repeat_penalty(),
            presence_penalty: default_presence_penalty(),
        }
    }
}

/// Streaming chat request to the model server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    #[serde(default)]
    pub stream: bool,
    pub messages: Vec<PromptMessage>,
    pub options: ChatOptions,
}

/// One decoded unit of the upstream streaming protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// A non-empty fragment of assistant text.
    Delta(String),
    /// The upstream reported `done: true`.
    Done,
}

/// Errors from the upstream model server client.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The server answered the initial request with a non-success status.
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The connection could not be established.
    #[error("upstream connection failed: {0}")]
    Connect(String),

    /// The response body failed mid-stream.
    #[error("stream error: {0}")]
    Stream(String),

    /// The cancellation token fired before the stream finished.
    #[error("stream cancelled")]
    Cancelled,

    /// The configured maximum stream duration elapsed.
    #[error("stream exceeded maximum duration of {0}s")]
    DeadlineExceeded(u64),
}

impl UpstreamError {
    /// Cancellation-class outcomes end a session as aborted rather than failed.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, UpstreamError::Cancelled | UpstreamError::DeadlineExceeded(_))
    }
}
