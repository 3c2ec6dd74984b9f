//! munch-server/src/identity.rs
//!
//! The upstream identity provider puts the caller's user id in `x-user-id`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller, as asserted by the identity layer in front of us.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;
        let user_id = Uuid::parse_str(raw.trim()).map_err(|_| ApiError::Unauthenticated)?;
        Ok(AuthenticatedUser(user_id))
    }
}
