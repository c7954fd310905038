use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::extractors::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;
use crate::users::dto::{PublicUser, RegisterRequest};
use crate::users::repo_types::UserPatch;
use crate::users::services;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users", get(list_users))
        .route("/users/me", get(get_me))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = services::register(state.store.as_ref(), &state.config.policy, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip(state, current))]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = services::list_users(state.store.as_ref(), &current).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, current))]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::get_user(state.store.as_ref(), &current, id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, current, patch))]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::update_user(
        state.store.as_ref(),
        &state.config.policy,
        &current,
        id,
        patch,
    )
    .await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, current))]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_user(state.store.as_ref(), &current, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
