use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::config::JwtConfig;
use crate::state::AppState;

/// JWT payload: the subject is the user's email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Defaults to empty when absent, so a subject-less token is reported
    /// as `MissingSubject` rather than a generic decode failure.
    #[serde(default)]
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("could not validate token")]
    Malformed,
    #[error("token has no subject")]
    MissingSubject,
}

/// Signing and verification keys derived from the configured secret.
///
/// Rotating the secret invalidates every outstanding token; there is no
/// server-side session store.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            ttl: Duration::from_secs((cfg.ttl_minutes as u64) * 60),
        }
    }

    /// Configured token lifetime in seconds, reported to clients at login.
    pub fn expires_in(&self) -> u64 {
        self.ttl.as_secs()
    }

    pub fn sign(&self, subject: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(subject = %claims.sub, "jwt signed");
        Ok(token)
    }

    /// Verify signature and expiry. A token is rejected from its `exp`
    /// timestamp onwards, with zero leeway.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;
        if data.claims.sub.trim().is_empty() {
            return Err(TokenError::MissingSubject);
        }
        debug!(subject = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(ttl_minutes: i64) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "dev-secret".into(),
            ttl_minutes,
        })
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys(5);
        let token = keys.sign("user@example.com").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "user@example.com");
        assert_eq!(claims.exp, claims.iat + 300);
    }

    #[test]
    fn expires_in_reports_the_configured_ttl() {
        assert_eq!(make_keys(30).expires_in(), 1800);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = make_keys(5);
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: "user@example.com".into(),
            iat: now - 600,
            exp: now - 300,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert_eq!(keys.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_signed_with_another_secret_is_malformed() {
        let keys = make_keys(5);
        let other = JwtKeys::new(&JwtConfig {
            secret: "rotated-secret".into(),
            ttl_minutes: 5,
        });
        let token = other.sign("user@example.com").unwrap();
        assert_eq!(keys.verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = make_keys(5);
        assert_eq!(keys.verify("not.a.token"), Err(TokenError::Malformed));
    }

    #[test]
    fn absent_subject_is_rejected() {
        #[derive(Serialize)]
        struct Bare {
            iat: usize,
            exp: usize,
        }
        let keys = make_keys(5);
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let bare = Bare {
            iat: now,
            exp: now + 300,
        };
        let token = encode(&Header::default(), &bare, &keys.encoding).unwrap();
        assert_eq!(keys.verify(&token), Err(TokenError::MissingSubject));
    }

    #[test]
    fn blank_subject_is_rejected() {
        let keys = make_keys(5);
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: "   ".into(),
            iat: now,
            exp: now + 300,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert_eq!(keys.verify(&token), Err(TokenError::MissingSubject));
    }
}
