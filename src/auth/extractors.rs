use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::auth::jwt::JwtKeys;
use crate::auth::services::resolve_current_user;
use crate::error::AppError;
use crate::state::AppState;
use crate::users::repo_types::User;

/// Extracts the bearer token and resolves it to a live user record.
///
/// The store is consulted on every request: a token is worthless once its
/// subject has been deleted or disabled.
#[derive(Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::Unauthorized("Missing Authorization header"))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AppError::Unauthorized("Invalid Authorization header"))?;

        let keys = JwtKeys::from_ref(state);
        let user = resolve_current_user(state.store.as_ref(), &keys, token).await?;
        Ok(CurrentUser(user))
    }
}
