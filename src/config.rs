use anyhow::Result;
use argon2::{
    Argon2, ParamsBuilder,
    password_hash::{PasswordHasher, SaltString},
};
use chrono::Duration;
use rand::{RngCore, rngs::OsRng};
use std::env;
use zeroize::Zeroizing;

/// The maximum number of failed login attempts before lockout.
pub const MAX_LOGIN_ATTEMPTS: u32 = 3;
/// How long a lockout lasts, in seconds.
pub const BLOCK_DURATION_SECS: i64 = 5 * 60;
/// How long an issued session token stays valid, in seconds.
pub const TOKEN_EXPIRY_SECS: i64 = 30 * 60;
/// How long a session survives without activity, in seconds.
pub const INACTIVITY_TIMEOUT_SECS: i64 = 30 * 60;

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 6;

/// Default operator identifier, overridable via `ADMIN_EMAIL`.
const DEFAULT_ADMIN_EMAIL: &str = "admin@arantes.com.br";
/// Default operator secret, overridable via `ADMIN_PASSWORD`. Visible by
/// design: the admin area only raises the bar against casual tampering.
const DEFAULT_ADMIN_PASSWORD: &str = "ArantesSecure2024!";

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The operator identifier accepted at login.
    pub admin_email: String,
    /// Argon2id PHC hash of the operator secret.
    pub admin_password_hash: String,
    /// Failed attempts tolerated before the limiter blocks.
    pub max_login_attempts: u32,
    /// Lockout window applied once the limit is reached.
    pub block_duration: Duration,
    /// Lifetime of an issued session token.
    pub token_expiry: Duration,
    /// Inactivity window after which a session is treated as stale.
    pub inactivity_timeout: Duration,
}

impl Config {
    /// Creates a `Config` with the given operator credentials.
    ///
    /// The secret is hashed with Argon2id immediately; the plaintext is not
    /// retained.
    pub fn new(admin_email: &str, admin_password: &str) -> Result<Self> {
        let password = Zeroizing::new(admin_password.as_bytes().to_vec());
        let hash = hash_secret(&password)?;

        Ok(Self {
            admin_email: admin_email.to_string(),
            admin_password_hash: hash,
            max_login_attempts: MAX_LOGIN_ATTEMPTS,
            block_duration: Duration::seconds(BLOCK_DURATION_SECS),
            token_expiry: Duration::seconds(TOKEN_EXPIRY_SECS),
            inactivity_timeout: Duration::seconds(INACTIVITY_TIMEOUT_SECS),
        })
    }

    /// Creates a `Config` from environment variables, falling back to the
    /// baked-in credentials when unset.
    pub fn from_env() -> Result<Self> {
        let email = env::var("ADMIN_EMAIL").unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string());
        let password = Zeroizing::new(
            env::var("ADMIN_PASSWORD").unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string()),
        );

        Self::new(&email, &password)
    }
}

/// Hashes the operator secret using Argon2id.
fn hash_secret(secret: &[u8]) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| anyhow::anyhow!("Salt encoding error: {}", e))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| anyhow::anyhow!("Argon2 params: {}", e))?,
    );

    let hash = argon2
        .hash_password(secret, &salt)
        .map_err(|e| anyhow::anyhow!("Argon2 hash error: {}", e))?
        .to_string();

    tracing::debug!("Operator secret hashed with Argon2id");
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_hashes_the_secret() {
        let config = Config::new("ops@example.com", "hunter2hunter2").unwrap();
        assert_eq!(config.admin_email, "ops@example.com");
        assert!(config.admin_password_hash.starts_with("$argon2id$"));
    }

    #[test]
    fn defaults_match_the_published_limits() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.max_login_attempts, 3);
        assert_eq!(config.block_duration.num_seconds(), 300);
        assert_eq!(config.token_expiry.num_minutes(), 30);
        assert_eq!(config.inactivity_timeout.num_minutes(), 30);
    }
}
