use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{LoginRequest, TokenResponse};
use crate::auth::jwt::JwtKeys;
use crate::auth::services;
use crate::error::AppError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/users/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let token = services::login(state.store.as_ref(), &keys, &payload).await?;
    Ok(Json(token))
}
