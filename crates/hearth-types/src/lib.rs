//! Shared domain types for Hearth.
//!
//! This crate contains the types used across the Hearth gateway:
//! conversations and messages, the upstream chat request/frame shapes,
//! configuration, and the error enums shared by every layer.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
