//! The streaming chat relay.
//!
//! - `context`: prompt assembly (system directive + history + new turn)
//! - `title`: deterministic conversation titles from the first utterance
//! - `session`: the per-request state machine tying store and upstream together

pub mod context;
pub mod session;
pub mod title;

#[cfg(test)]
mod testing;
