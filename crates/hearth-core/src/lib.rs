//! Business logic and trait definitions for Hearth.
//!
//! This crate defines the "ports" (the conversation store and the upstream
//! model client) that the infrastructure layer implements, plus the relay
//! session that drives one chat turn across them. It depends only on
//! `hearth-types` -- never on `hearth-infra` or any database/IO crate.

pub mod conversation;
pub mod llm;
pub mod relay;
