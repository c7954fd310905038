use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::PolicyConfig;
use crate::error::AppError;
use crate::users::repo_types::{User, UserPatch};

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub surname: String,
    pub username: String,
    pub email: String,
    pub age: i32,
    pub password: String,
}

/// External view of a user; the password hash never leaves the store
/// boundary.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub username: String,
    pub email: String,
    pub age: i32,
    pub is_admin: bool,
    pub disabled: bool,
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            surname: u.surname,
            username: u.username,
            email: u.email,
            age: u.age,
            is_admin: u.is_admin,
            disabled: u.disabled,
            created_at: u.created_at,
        }
    }
}

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]{3,20}$").unwrap();
}

const MAX_AGE: i32 = 120;

fn check_name(field: &'static str, value: &str) -> Result<(), AppError> {
    let len = value.chars().count();
    if !(2..=50).contains(&len) {
        return Err(AppError::Validation(format!(
            "{field} must be between 2 and 50 characters"
        )));
    }
    Ok(())
}

fn check_username(value: &str) -> Result<(), AppError> {
    if !USERNAME_RE.is_match(value) {
        return Err(AppError::Validation(
            "username must be 3-20 letters, digits or underscores".into(),
        ));
    }
    Ok(())
}

fn check_email(value: &str) -> Result<(), AppError> {
    if !EMAIL_RE.is_match(value) {
        return Err(AppError::Validation("invalid email address".into()));
    }
    Ok(())
}

fn check_age(value: i32, policy: &PolicyConfig) -> Result<(), AppError> {
    if value < policy.min_age || value > MAX_AGE {
        return Err(AppError::Validation(format!(
            "age must be between {} and {}",
            policy.min_age, MAX_AGE
        )));
    }
    Ok(())
}

fn check_password(value: &str, policy: &PolicyConfig) -> Result<(), AppError> {
    if value.chars().count() < policy.min_password_length {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            policy.min_password_length
        )));
    }
    if !value.chars().any(|c| c.is_uppercase()) {
        return Err(AppError::Validation(
            "password must contain an uppercase letter".into(),
        ));
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation("password must contain a digit".into()));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(
            "password cannot contain whitespace".into(),
        ));
    }
    Ok(())
}

pub fn validate_registration(
    req: &RegisterRequest,
    policy: &PolicyConfig,
) -> Result<(), AppError> {
    check_name("name", &req.name)?;
    check_name("surname", &req.surname)?;
    check_username(&req.username)?;
    check_email(&req.email)?;
    check_age(req.age, policy)?;
    check_password(&req.password, policy)
}

/// Validate only the fields the patch actually carries.
pub fn validate_patch(patch: &UserPatch, policy: &PolicyConfig) -> Result<(), AppError> {
    if let Some(name) = &patch.name {
        check_name("name", name)?;
    }
    if let Some(surname) = &patch.surname {
        check_name("surname", surname)?;
    }
    if let Some(username) = &patch.username {
        check_username(username)?;
    }
    if let Some(email) = &patch.email {
        check_email(email)?;
    }
    if let Some(age) = patch.age {
        check_age(age, policy)?;
    }
    Ok(())
}
