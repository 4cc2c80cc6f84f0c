//! Prompt assembly for the upstream chat request.
//!
//! The prompt is always: one system directive chosen by model, the prior
//! history verbatim, then the new user utterance last.

use hearth_types::conversation::Message;
use hearth_types::error::RelayError;
use hearth_types::llm::{MessageRole, PromptMessage};

const REASONING_DIRECTIVE: &str = "You are a reasoning-focused assistant.\n\
Explain concepts clearly and accurately.\n\
Use proper paragraphs and bullet points when helpful.\n\
Do NOT repeat words or phrases.\n\
Do NOT expose chain-of-thought or internal reasoning.\n\
Present conclusions cleanly and concisely.";

const CONCISE_DIRECTIVE: &str = "You are a fast, concise assistant.\n\
Answer clearly and directly.\n\
Keep responses short unless more detail is requested.\n\
Avoid repetition.\n\
Use bullet points only when helpful.";

const DEFAULT_DIRECTIVE: &str = "You are a helpful assistant. Be concise and clear.";

/// System directive for a model identifier.
pub fn system_directive(model: &str) -> &'static str {
    match model {
        "deepseek-r1:7b" => REASONING_DIRECTIVE,
        "llama3.1:8b" => CONCISE_DIRECTIVE,
        _ => DEFAULT_DIRECTIVE,
    }
}

/// Build the ordered prompt sent upstream.
///
/// `history` must already exclude the record of `utterance` itself.
pub fn build_prompt(
    model: &str,
    history: &[Message],
    utterance: &str,
) -> Result<Vec<PromptMessage>, RelayError> {
    if model.trim().is_empty() {
        return Err(RelayError::Validation("model identifier is required".to_string()));
    }

    let mut prompt = Vec::with_capacity(history.len() + 2);
    prompt.push(PromptMessage::new(MessageRole::System, system_directive(model)));
    prompt.extend(
        history
            .iter()
            .map(|m| PromptMessage::new(m.role, m.content.clone())),
    );
    prompt.push(PromptMessage::new(MessageRole::User, utterance));

    Ok(prompt)
}
