//! Conversation persistence abstractions for Hearth.
//!
//! This module defines the `ConversationStore` trait that the infrastructure
//! layer implements for conversation and message records.

pub mod store;
