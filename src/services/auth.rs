use crate::clock::Clock;
use crate::config::Config;
use crate::crypto::{aes, fingerprint::BrowserEnvironment, fingerprint::session_key};
use crate::error::{AppError, Result};
use crate::models::session::{LoginOutcome, SecurityEventKind, TokenClaims};
use crate::services::audit::SecurityLog;
use crate::services::limiter::AttemptLimiter;
use crate::store::{KeyValueStore, keys};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
use chrono::{DateTime, Utc};
use rand::{Rng, RngCore, rngs::OsRng};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::Zeroize;

/// Lower bound of the artificial verification delay, in milliseconds.
const VERIFY_DELAY_MIN_MS: u64 = 500;
/// Upper bound of the artificial verification delay, in milliseconds.
const VERIFY_DELAY_MAX_MS: u64 = 1500;

/// Store keys overwritten with random data before removal at logout.
const SENSITIVE_KEYS: [&str; 5] = [
    keys::AUTH_TOKEN,
    keys::LOGIN_TIME,
    keys::SECURITY_LOGS,
    keys::LOGIN_ATTEMPTS,
    keys::LAST_ATTEMPT_TIME,
];

/// Authenticates the operator and manages the admin session token.
///
/// Orchestrates a login attempt as limiter check, credential verification,
/// token mint, with every security-relevant transition appended to the
/// audit log. All verification failures surface as `false`/denied results,
/// never as errors.
#[derive(Clone)]
pub struct AuthService {
    config: Arc<Config>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    environment: BrowserEnvironment,
    limiter: AttemptLimiter,
    audit: SecurityLog,
}

impl AuthService {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        environment: BrowserEnvironment,
    ) -> Self {
        let limiter = AttemptLimiter::new(&config, store.clone(), clock.clone());
        let audit = SecurityLog::new(store.clone(), clock.clone(), environment.clone());

        Self {
            config,
            store,
            clock,
            environment,
            limiter,
            audit,
        }
    }

    /// The attempt limiter backing this service.
    pub fn limiter(&self) -> &AttemptLimiter {
        &self.limiter
    }

    /// The audit log backing this service.
    pub fn audit(&self) -> &SecurityLog {
        &self.audit
    }

    /// Handles a login request end to end.
    ///
    /// Lockout is checked before credentials, so blocked attempts never
    /// reach verification and never extend the lockout window. The denial
    /// message stays generic: nothing distinguishes a bad identifier from a
    /// bad secret.
    pub async fn login(&self, identifier: &str, secret: &str) -> LoginOutcome {
        let status = self.limiter.check_blocked();
        if status.blocked {
            self.audit
                .log_event(SecurityEventKind::BlockedLoginAttempt, None);
            tracing::warn!(
                "Login rejected during lockout ({}s remaining)",
                status.remaining_seconds
            );
            return LoginOutcome::Blocked {
                remaining_seconds: status.remaining_seconds,
            };
        }

        if !self.verify_credentials(identifier, secret).await {
            let state = self.limiter.record_failure();

            if state.count >= self.config.max_login_attempts {
                self.audit.log_event(SecurityEventKind::AccountBlocked, None);
                return LoginOutcome::Blocked {
                    remaining_seconds: self.config.block_duration.num_seconds(),
                };
            }

            self.audit
                .log_event(SecurityEventKind::InvalidCredentials, None);
            return LoginOutcome::Denied {
                attempts_remaining: self.config.max_login_attempts - state.count,
            };
        }

        self.limiter.record_success();

        match self.issue_token() {
            Ok(token) => {
                self.audit.log_event(SecurityEventKind::SuccessfulLogin, None);
                tracing::info!("Operator authenticated, session token issued");
                LoginOutcome::Granted { token }
            }
            Err(e) => {
                // Minting failed after a correct secret. Surfacing a generic
                // denial keeps the no-exception contract of the surface.
                tracing::error!("Token issuance failed: {}", e);
                LoginOutcome::Denied {
                    attempts_remaining: self.config.max_login_attempts,
                }
            }
        }
    }

    /// Verifies operator credentials.
    ///
    /// Always takes a uniformly random 500–1500 ms, whatever the outcome,
    /// so response timing does not reveal which factor was wrong. The
    /// identifier is compared constant-time; the secret is verified against
    /// the stored Argon2 hash. Both checks run unconditionally.
    pub async fn verify_credentials(&self, identifier: &str, secret: &str) -> bool {
        let delay_ms = OsRng.gen_range(VERIFY_DELAY_MIN_MS..=VERIFY_DELAY_MAX_MS);
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;

        let identifier_ok: bool = identifier
            .as_bytes()
            .ct_eq(self.config.admin_email.as_bytes())
            .into();

        let mut secret_bytes = secret.as_bytes().to_vec();
        let secret_ok = match PasswordHash::new(&self.config.admin_password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(&secret_bytes, &parsed)
                .is_ok(),
            Err(e) => {
                tracing::error!("Stored credential hash unparseable: {}", e);
                false
            }
        };
        secret_bytes.zeroize();

        identifier_ok && secret_ok
    }

    /// Mints a session token bound to the current environment.
    ///
    /// The claims are sealed under a key derived from the fingerprint and
    /// persisted as the single active token; the activity timestamp starts
    /// now.
    pub fn issue_token(&self) -> Result<String> {
        let fingerprint = self.environment.fingerprint();
        let now = self.clock.now();

        let claims = TokenClaims {
            fingerprint: fingerprint.clone(),
            issued_at: now,
            nonce: Uuid::new_v4(),
            expires_at: now + self.config.token_expiry,
        };

        let json = sonic_rs::to_string(&claims)
            .map_err(|e| AppError::Serialization(format!("Token claims: {}", e)))?;
        let token = aes::seal(&session_key(&fingerprint), json.as_bytes())?;

        self.store.set(keys::AUTH_TOKEN, &token)?;
        self.store.set(keys::LOGIN_TIME, &now.to_rfc3339())?;

        tracing::debug!("Session token issued, expires at {}", claims.expires_at);
        Ok(token)
    }

    /// Validates a token against the current environment and clocks.
    ///
    /// Fails closed: any decryption error, fingerprint mismatch, expiry, or
    /// inactivity timeout yields `false`. Never returns an error.
    pub fn validate_token(&self, token: &str) -> bool {
        let fingerprint = self.environment.fingerprint();

        let plaintext = match aes::open(&session_key(&fingerprint), token) {
            Ok(plaintext) => plaintext,
            Err(_) => return false,
        };

        let claims: TokenClaims = match sonic_rs::from_slice(&plaintext) {
            Ok(claims) => claims,
            Err(_) => return false,
        };

        if claims.fingerprint != fingerprint {
            return false;
        }

        let now = self.clock.now();
        if now >= claims.expires_at {
            return false;
        }

        match self.last_activity() {
            Some(last) if now - last >= self.config.inactivity_timeout => false,
            _ => true,
        }
    }

    /// Refreshes the activity timestamp, pushing back the inactivity cutoff.
    pub fn touch_activity(&self) {
        if let Err(e) = self
            .store
            .set(keys::LOGIN_TIME, &self.clock.now().to_rfc3339())
        {
            tracing::warn!("Failed to record session activity: {}", e);
        }
    }

    /// Validates the persisted session as a whole.
    ///
    /// Tampering or an invalid token is fatal: the session is cleared and
    /// the caller returns the operator to the login surface.
    pub fn check_session(&self) -> bool {
        if self.audit.detect_tampering() {
            self.audit
                .log_event(SecurityEventKind::TamperingDetected, None);
            tracing::warn!("Tamper probe failed, clearing session");
            self.clear_session();
            return false;
        }

        let token = match self.store.get(keys::AUTH_TOKEN) {
            Ok(Some(token)) => token,
            _ => return false,
        };

        if !self.validate_token(&token) {
            self.audit.log_event(SecurityEventKind::SessionExpired, None);
            self.clear_session();
            return false;
        }

        self.touch_activity();
        true
    }

    /// Logs the operator out and clears the session.
    pub fn logout(&self) {
        self.audit.log_event(SecurityEventKind::Logout, None);
        self.clear_session();
        tracing::info!("Operator logged out");
    }

    /// Overwrites every session-related key with random data, then removes
    /// it. Defense against naive forensic recovery of the old values, not
    /// against an attacker with runtime access.
    pub fn clear_session(&self) {
        for key in SENSITIVE_KEYS {
            let mut noise = [0u8; 256];
            OsRng.fill_bytes(&mut noise);

            if let Err(e) = self.store.set(key, &hex::encode(noise)) {
                tracing::warn!("Failed to overwrite {}: {}", key, e);
            }
            if let Err(e) = self.store.remove(key) {
                tracing::warn!("Failed to remove {}: {}", key, e);
            }
        }

        self.audit
            .log_event(SecurityEventKind::SecureDataCleared, None);
    }

    fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.store
            .get(keys::LOGIN_TIME)
            .unwrap_or(None)
            .and_then(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn service_with(
        environment: BrowserEnvironment,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    ) -> AuthService {
        let config = Arc::new(Config::new("admin@arantes.com.br", "ArantesSecure2024!").unwrap());
        AuthService::new(config, store, clock, environment)
    }

    fn service() -> (AuthService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryStore::new());
        (
            service_with(BrowserEnvironment::default(), store, clock.clone()),
            clock,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn correct_credentials_verify() {
        let (auth, _clock) = service();
        assert!(
            auth.verify_credentials("admin@arantes.com.br", "ArantesSecure2024!")
                .await
        );
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_factor_fails_either_way() {
        let (auth, _clock) = service();
        assert!(
            !auth
                .verify_credentials("admin@arantes.com.br", "senha-errada")
                .await
        );
        assert!(
            !auth
                .verify_credentials("outro@arantes.com.br", "ArantesSecure2024!")
                .await
        );
    }

    #[test]
    fn issued_token_validates_in_the_same_environment() {
        let (auth, _clock) = service();
        let token = auth.issue_token().unwrap();
        assert!(auth.validate_token(&token));
    }

    #[test]
    fn expired_token_is_rejected() {
        let (auth, clock) = service();
        let token = auth.issue_token().unwrap();

        clock.advance(Duration::minutes(31));
        assert!(!auth.validate_token(&token));
    }

    #[test]
    fn token_is_bound_to_the_issuing_environment() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryStore::new());
        let auth = service_with(BrowserEnvironment::default(), store.clone(), clock.clone());
        let token = auth.issue_token().unwrap();

        let mut other_env = BrowserEnvironment::default();
        other_env.screen_width = 2560;
        let other = service_with(other_env, store, clock);

        assert!(!other.validate_token(&token));
    }

    #[test]
    fn inactivity_times_out_before_hard_expiry() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryStore::new());
        let mut config = Config::new("admin@arantes.com.br", "ArantesSecure2024!").unwrap();
        config.token_expiry = Duration::hours(2);
        let auth = AuthService::new(
            Arc::new(config),
            store,
            clock.clone(),
            BrowserEnvironment::default(),
        );

        let token = auth.issue_token().unwrap();
        clock.advance(Duration::minutes(29));
        auth.touch_activity();
        clock.advance(Duration::minutes(29));
        assert!(auth.validate_token(&token));

        clock.advance(Duration::minutes(31));
        assert!(!auth.validate_token(&token));
    }

    #[test]
    fn clear_session_removes_every_sensitive_key() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryStore::new());
        let auth = service_with(BrowserEnvironment::default(), store.clone(), clock);

        auth.issue_token().unwrap();
        auth.clear_session();

        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);
        assert_eq!(store.get(keys::LOGIN_TIME).unwrap(), None);

        // Clearing itself is recorded as the sole surviving event.
        let events = auth.audit().read_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, SecurityEventKind::SecureDataCleared);
    }

    #[test]
    fn check_session_clears_on_tampered_log() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryStore::new());
        let auth = service_with(BrowserEnvironment::default(), store.clone(), clock);

        auth.issue_token().unwrap();
        store
            .set(keys::SECURITY_LOGS, "[\"bm90IGEgcmVhbCBlbnRyeQ==\"]")
            .unwrap();

        assert!(!auth.check_session());
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);
    }

    #[test]
    fn check_session_accepts_a_live_session() {
        let (auth, _clock) = service();
        auth.issue_token().unwrap();
        assert!(auth.check_session());
    }
}
