use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::{NewUser, User, UserPatch};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique key violation")]
    Duplicate,
    #[error("{0}")]
    Unavailable(String),
}

/// Persistence boundary for user records.
///
/// Uniqueness of `email` and `username` is enforced at this layer;
/// violations surface as `StoreError::Duplicate`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Insert a new record and return the assigned id.
    async fn insert(&self, user: NewUser) -> Result<Uuid, StoreError>;
    /// Apply the fields present in `patch`; `None` means the target is gone.
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn list_all(&self) -> Result<Vec<User>, StoreError>;
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        // 23505 = unique_violation
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::Duplicate;
        }
    }
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, surname, username, email, age, is_admin, disabled,
                   password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, surname, username, email, age, is_admin, disabled,
                   password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx)
    }

    async fn insert(&self, user: NewUser) -> Result<Uuid, StoreError> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (name, surname, username, email, age, is_admin, disabled, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&user.name)
        .bind(&user.surname)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.age)
        .bind(user.is_admin)
        .bind(user.disabled)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_sqlx)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                surname = COALESCE($3, surname),
                username = COALESCE($4, username),
                email = COALESCE($5, email),
                age = COALESCE($6, age),
                disabled = COALESCE($7, disabled)
            WHERE id = $1
            RETURNING id, name, surname, username, email, age, is_admin, disabled,
                      password_hash, created_at
            "#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.surname)
        .bind(patch.username)
        .bind(patch.email)
        .bind(patch.age)
        .bind(patch.disabled)
        .fetch_optional(&self.db)
        .await
        .map_err(map_sqlx)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, surname, username, email, age, is_admin, disabled,
                   password_hash, created_at
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(map_sqlx)
    }
}

/// In-memory store backing `AppState::fake()` and the service tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<Uuid, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(StoreError::Duplicate);
        }
        let id = Uuid::new_v4();
        users.push(User {
            id,
            name: user.name,
            surname: user.surname,
            username: user.username,
            email: user.email,
            age: user.age,
            is_admin: user.is_admin,
            disabled: user.disabled,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &patch.email {
            if users.iter().any(|u| u.id != id && u.email == *email) {
                return Err(StoreError::Duplicate);
            }
        }
        if let Some(username) = &patch.username {
            if users.iter().any(|u| u.id != id && u.username == *username) {
                return Err(StoreError::Duplicate);
            }
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(surname) = patch.surname {
            user.surname = surname;
        }
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(age) = patch.age {
            user.age = age;
        }
        if let Some(disabled) = patch.disabled {
            user.disabled = disabled;
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }

    async fn list_all(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.lock().unwrap().clone())
    }
}
