use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

/// Account policy knobs: password strength floor and the regulatory
/// minimum age for registration.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    pub min_password_length: usize,
    pub min_age: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub policy: PolicyConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;

        // The signing secret has no default; startup fails without it.
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        if secret.is_empty() {
            anyhow::bail!("JWT_SECRET must be set in environment variables");
        }

        let jwt = JwtConfig {
            secret,
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
        };
        let policy = PolicyConfig {
            min_password_length: std::env::var("MIN_PASSWORD_LENGTH")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(12),
            min_age: std::env::var("MIN_AGE")
                .ok()
                .and_then(|v| v.parse::<i32>().ok())
                .unwrap_or(13),
        };

        Ok(Self {
            database_url,
            jwt,
            policy,
        })
    }
}
