//! Requester identity.
//!
//! Users are authenticated upstream; the gateway forwards the numeric user id
//! in the `x-user-id` header.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::UserId;
use crate::error::AppError;

pub const USER_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {} header", USER_HEADER)))?;

        let id = raw
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::Unauthorized(format!("invalid {} header", USER_HEADER)))?;

        Ok(Requester(UserId::new(id)))
    }
}
