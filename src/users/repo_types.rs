use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub username: String,
    pub email: String,
    pub age: i32,
    pub is_admin: bool,
    pub disabled: bool,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

/// Insert payload; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub username: String,
    pub email: String,
    pub age: i32,
    pub is_admin: bool,
    pub disabled: bool,
    pub password_hash: String,
}

/// Partial update covering only the mutable profile fields.
///
/// `id` and the password hash cannot travel through this type, so no
/// update path can overwrite them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub disabled: Option<bool>,
}
