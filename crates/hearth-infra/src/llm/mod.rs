//! Upstream model server clients.

pub mod ollama;
