//! SQLite persistence for conversations and messages.

pub mod conversation;
pub mod pool;
