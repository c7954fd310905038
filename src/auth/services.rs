use tracing::{info, warn};

use crate::auth::dto::{LoginRequest, TokenResponse};
use crate::auth::jwt::{JwtKeys, TokenError};
use crate::auth::password::verify_password;
use crate::error::AppError;
use crate::users::repo_types::User;
use crate::users::store::UserStore;

/// Check a plaintext credential against the stored record.
///
/// Unknown email and wrong password fail with the same error, so the
/// response never reveals which accounts exist. This intentionally does not
/// look at `disabled`; callers decide what a disabled account may do.
pub async fn authenticate(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let email = email.trim().to_lowercase();
    let user = match store.find_by_email(&email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login failed: unknown email");
            return Err(AppError::InvalidCredentials);
        }
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, "login failed: password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}

/// Issue a bearer token carrying the user's email as subject.
pub fn issue_session(keys: &JwtKeys, user: &User) -> Result<TokenResponse, AppError> {
    let access_token = keys.sign(&user.email)?;
    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: keys.expires_in(),
    })
}

/// Full login flow: credentials, then account state, then token issuance.
///
/// Disabled accounts keep valid credentials but are refused a session
/// before any token exists.
pub async fn login(
    store: &dyn UserStore,
    keys: &JwtKeys,
    req: &LoginRequest,
) -> Result<TokenResponse, AppError> {
    let user = authenticate(store, &req.email, &req.password).await?;

    if user.disabled {
        warn!(email = %user.email, "login rejected: account disabled");
        return Err(AppError::InactiveUser);
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    issue_session(keys, &user)
}

/// Re-resolve the request identity from a bearer token.
///
/// Runs on every authenticated request: the subject must still exist and
/// must not be disabled, regardless of what was true at issuance.
pub async fn resolve_current_user(
    store: &dyn UserStore,
    keys: &JwtKeys,
    token: &str,
) -> Result<User, AppError> {
    let claims = keys.verify(token).map_err(|e| match e {
        TokenError::Expired => AppError::Unauthorized("Token has expired"),
        TokenError::Malformed | TokenError::MissingSubject => {
            AppError::Unauthorized("Could not validate credentials")
        }
    })?;

    let user = store
        .find_by_email(&claims.sub)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if user.disabled {
        warn!(email = %user.email, "request from disabled user");
        return Err(AppError::InactiveUser);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::config::JwtConfig;
    use crate::users::repo_types::{NewUser, UserPatch};
    use crate::users::store::MemoryUserStore;
    use uuid::Uuid;

    fn keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            ttl_minutes: 5,
        })
    }

    async fn seed_user(
        store: &MemoryUserStore,
        email: &str,
        password: &str,
        disabled: bool,
    ) -> Uuid {
        store
            .insert(NewUser {
                name: "Ada".into(),
                surname: "Lovelace".into(),
                username: email.split('@').next().unwrap().to_string(),
                email: email.into(),
                age: 30,
                is_admin: false,
                disabled,
                password_hash: hash_password(password).unwrap(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let store = MemoryUserStore::new();
        seed_user(&store, "ada@example.com", "Abcdef12", false).await;

        let unknown = authenticate(&store, "nobody@example.com", "Abcdef12")
            .await
            .unwrap_err();
        let mismatch = authenticate(&store, "ada@example.com", "Wrong999")
            .await
            .unwrap_err();

        assert_eq!(unknown.kind(), "invalid_credentials");
        assert_eq!(mismatch.kind(), "invalid_credentials");
        assert_eq!(unknown.to_string(), mismatch.to_string());
    }

    #[tokio::test]
    async fn authenticate_normalizes_the_email() {
        let store = MemoryUserStore::new();
        seed_user(&store, "ada@example.com", "Abcdef12", false).await;

        let user = authenticate(&store, "  Ada@Example.COM ", "Abcdef12")
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn login_issues_a_verifiable_token() {
        let store = MemoryUserStore::new();
        seed_user(&store, "ada@example.com", "Abcdef12", false).await;
        let keys = keys();

        let resp = login(
            &store,
            &keys,
            &LoginRequest {
                email: "ada@example.com".into(),
                password: "Abcdef12".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(resp.token_type, "bearer");
        assert_eq!(resp.expires_in, 300);
        let claims = keys.verify(&resp.access_token).unwrap();
        assert_eq!(claims.sub, "ada@example.com");
    }

    #[tokio::test]
    async fn login_rejects_disabled_accounts_before_issuing_a_token() {
        let store = MemoryUserStore::new();
        seed_user(&store, "off@example.com", "Abcdef12", true).await;

        let err = login(
            &store,
            &keys(),
            &LoginRequest {
                email: "off@example.com".into(),
                password: "Abcdef12".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "inactive_user");
    }

    #[tokio::test]
    async fn resolve_roundtrip_returns_the_subject() {
        let store = MemoryUserStore::new();
        seed_user(&store, "ada@example.com", "Abcdef12", false).await;
        let keys = keys();
        let token = keys.sign("ada@example.com").unwrap();

        let user = resolve_current_user(&store, &keys, &token).await.unwrap();
        assert_eq!(user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn resolve_after_delete_is_not_found() {
        let store = MemoryUserStore::new();
        let id = seed_user(&store, "gone@example.com", "Abcdef12", false).await;
        let keys = keys();
        let token = keys.sign("gone@example.com").unwrap();

        assert!(store.delete(id).await.unwrap());
        let err = resolve_current_user(&store, &keys, &token)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn resolve_of_a_disabled_user_is_inactive() {
        let store = MemoryUserStore::new();
        let id = seed_user(&store, "ada@example.com", "Abcdef12", false).await;
        let keys = keys();
        let token = keys.sign("ada@example.com").unwrap();

        store
            .update(
                id,
                UserPatch {
                    disabled: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = resolve_current_user(&store, &keys, &token)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "inactive_user");
    }

    #[tokio::test]
    async fn resolve_of_garbage_is_unauthorized() {
        let store = MemoryUserStore::new();
        let err = resolve_current_user(&store, &keys(), "not.a.token")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unauthorized");
    }
}
