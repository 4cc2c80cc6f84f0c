//! Caller identity extractor.
//!
//! Authentication happens at the front door (reverse proxy or auth
//! gateway), which forwards the authenticated user id in `X-User-Id`.
//! Requests without it are rejected before any work is done.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::http::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

        let user_id = value
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid X-User-Id header encoding".to_string()))?
            .trim();

        if user_id.is_empty() {
            return Err(AppError::Unauthorized("Unauthorized".to_string()));
        }

        Ok(Identity(user_id.to_string()))
    }
}
