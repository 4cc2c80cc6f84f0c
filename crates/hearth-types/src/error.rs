use thiserror::Error;

use crate::llm::UpstreamError;

/// Errors from repository operations (used by trait definitions in hearth-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors a relay session reports before its first streamed byte.
///
/// Anything that goes wrong after streaming has started is logged by the
/// session instead, since the client already holds a 200 response.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("conversation not found")]
    ConversationNotFound,

    #[error("store error: {0}")]
    Store(#[from] RepositoryError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
