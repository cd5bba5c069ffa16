use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};

use super::repo_types::User;
use crate::{error::AppError, state::AppState};

/// The authenticated user behind a request's bearer token.
///
/// Missing header rejects with `AuthRequired`. A bad or expired token, or a
/// token whose user no longer exists, rejects with `Unauthorized`.
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::AuthRequired)?;

        // Expect "Bearer <token>"
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::AuthRequired)?;

        let claims = state.jwt.verify(token).map_err(|e| {
            warn!(error = %e, "bearer token rejected");
            AppError::Unauthorized
        })?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token for unknown user");
                AppError::Unauthorized
            })?;

        debug!(user_id = %user.id, "request authenticated");
        Ok(AuthUser(user))
    }
}
