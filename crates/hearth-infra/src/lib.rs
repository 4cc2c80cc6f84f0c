//! Infrastructure layer for Hearth.
//!
//! Contains implementations of the traits defined in `hearth-core`: the
//! SQLite conversation store and the Ollama streaming client, plus the
//! data directory and `config.toml` loader.

pub mod config;
pub mod llm;
pub mod sqlite;
