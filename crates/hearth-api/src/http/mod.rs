//! HTTP layer for Hearth.
//!
//! Axum routes under `/api/`: the streaming chat relay plus conversation
//! browsing, with caller identity taken from a trusted front-door header and
//! JSON envelope error responses.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
