use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::config::PolicyConfig;
use crate::error::AppError;
use crate::users::dto::{validate_patch, validate_registration, RegisterRequest};
use crate::users::repo_types::{NewUser, User, UserPatch};
use crate::users::store::UserStore;

pub async fn register(
    store: &dyn UserStore,
    policy: &PolicyConfig,
    mut req: RegisterRequest,
) -> Result<User, AppError> {
    req.email = req.email.trim().to_lowercase();
    validate_registration(&req, policy)?;

    if store.find_by_email(&req.email).await?.is_some() {
        warn!(email = %req.email, "registration attempt with existing email");
        return Err(AppError::DuplicateKey);
    }

    let password_hash = hash_password(&req.password)?;
    let id = store
        .insert(NewUser {
            name: req.name,
            surname: req.surname,
            username: req.username,
            email: req.email,
            age: req.age,
            is_admin: false,
            disabled: false,
            password_hash,
        })
        .await?;

    // The insert may land while the read-back fails; report that as its
    // own condition so the caller knows the record can already exist.
    let created = store.find_by_id(id).await?.ok_or_else(|| {
        error!(user_id = %id, "user created but not found in store");
        AppError::RetrievalFailed
    })?;

    info!(user_id = %created.id, email = %created.email, "user registered");
    Ok(created)
}

/// Self-or-admin gate, decided on ids alone so a refused caller learns
/// nothing about whether the target exists.
fn ensure_self_or_admin(current: &User, target: Uuid) -> Result<(), AppError> {
    if current.is_admin || current.id == target {
        return Ok(());
    }
    warn!(user_id = %current.id, target = %target, "self-or-admin check failed");
    Err(AppError::Forbidden)
}

pub async fn get_user(
    store: &dyn UserStore,
    current: &User,
    target: Uuid,
) -> Result<User, AppError> {
    ensure_self_or_admin(current, target)?;
    store
        .find_by_id(target)
        .await?
        .ok_or(AppError::NotFound("User"))
}

pub async fn list_users(store: &dyn UserStore, current: &User) -> Result<Vec<User>, AppError> {
    if !current.is_admin {
        warn!(user_id = %current.id, "users list requested by non-admin");
        return Err(AppError::Forbidden);
    }
    Ok(store.list_all().await?)
}

pub async fn update_user(
    store: &dyn UserStore,
    policy: &PolicyConfig,
    current: &User,
    target: Uuid,
    mut patch: UserPatch,
) -> Result<User, AppError> {
    ensure_self_or_admin(current, target)?;
    if let Some(email) = patch.email.take() {
        patch.email = Some(email.trim().to_lowercase());
    }
    validate_patch(&patch, policy)?;

    let updated = store
        .update(target, patch)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    info!(user_id = %updated.id, "user updated");
    Ok(updated)
}

pub async fn delete_user(
    store: &dyn UserStore,
    current: &User,
    target: Uuid,
) -> Result<(), AppError> {
    ensure_self_or_admin(current, target)?;
    if !store.delete(target).await? {
        warn!(target = %target, "delete of unknown user");
        return Err(AppError::NotFound("User"));
    }
    info!(user_id = %target, "user deleted");
    Ok(())
}
