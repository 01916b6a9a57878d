use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{
    cookies::{read_cookie, SESSION_COOKIE},
    jwt::JwtKeys,
};
use crate::error::AppError;

/// Validates the session token from `Authorization: Bearer` or the session cookie.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);

        let bearer = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
            .map(str::to_string);

        let token = bearer
            .or_else(|| read_cookie(&parts.headers, SESSION_COOKIE))
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        let claims = keys.verify_session(&token).map_err(|e| {
            warn!(error = %e, "invalid or expired session");
            AppError::Unauthorized("Invalid or expired session".into())
        })?;

        Ok(AuthUser(claims.sub))
    }
}
