//! Custom Extractors
//!
//! Axum extractors for authenticated requests.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;

/// Reads the [`AuthUser`] stored by the auth middleware.
///
/// Rejects with 401 when the route is not behind the middleware or the
/// request was not authenticated.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))
    }
}
