use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The payload sealed inside an admin session token.
///
/// Serialized to JSON and AES-GCM encrypted under a key derived from the
/// issuing environment's fingerprint; the resulting blob is the token. A
/// different environment derives a different key and cannot open it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Fingerprint of the environment the token was issued in.
    pub fingerprint: String,
    /// When the token was minted.
    pub issued_at: DateTime<Utc>,
    /// Random per-token nonce; makes every token unique.
    pub nonce: Uuid,
    /// Hard expiry, independent of activity.
    pub expires_at: DateTime<Utc>,
}

/// Persisted failed-login bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginAttemptState {
    /// Consecutive failures since the last success or window expiry.
    pub count: u32,
    /// When the most recent failure happened.
    pub last_attempt: Option<DateTime<Utc>>,
}

/// Lockout status as reported to the login surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStatus {
    /// Whether login requests are currently rejected outright.
    pub blocked: bool,
    /// Seconds until the lockout lifts; 0 when not blocked.
    pub remaining_seconds: i64,
}

impl BlockStatus {
    /// The unblocked status.
    pub fn clear() -> Self {
        Self {
            blocked: false,
            remaining_seconds: 0,
        }
    }
}

/// The outcome of a login request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials accepted; carries the freshly minted session token.
    Granted { token: String },
    /// Credentials rejected. The message is deliberately generic — it never
    /// says whether the identifier or the secret was wrong.
    Denied { attempts_remaining: u32 },
    /// Lockout active; no credential check was performed.
    Blocked { remaining_seconds: i64 },
}

/// Security-relevant actions recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEventKind {
    SuccessfulLogin,
    InvalidCredentials,
    AccountBlocked,
    BlockedLoginAttempt,
    Logout,
    SessionExpired,
    TamperingDetected,
    SecureDataCleared,
    ContentUpdated,
}

impl std::fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SuccessfulLogin => "SUCCESSFUL_LOGIN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountBlocked => "ACCOUNT_BLOCKED",
            Self::BlockedLoginAttempt => "BLOCKED_LOGIN_ATTEMPT",
            Self::Logout => "LOGOUT",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::TamperingDetected => "TAMPERING_DETECTED",
            Self::SecureDataCleared => "SECURE_DATA_CLEARED",
            Self::ContentUpdated => "CONTENT_UPDATED",
        };
        f.write_str(name)
    }
}

/// One entry in the encrypted audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub timestamp: DateTime<Utc>,
    pub event: SecurityEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Fingerprint of the environment at log time.
    pub fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kinds_serialize_as_screaming_snake_case() {
        let json = sonic_rs::to_string(&SecurityEventKind::SuccessfulLogin).unwrap();
        assert_eq!(json, "\"SUCCESSFUL_LOGIN\"");

        let parsed: SecurityEventKind = sonic_rs::from_str("\"SECURE_DATA_CLEARED\"").unwrap();
        assert_eq!(parsed, SecurityEventKind::SecureDataCleared);
    }

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(
            SecurityEventKind::InvalidCredentials.to_string(),
            "INVALID_CREDENTIALS"
        );
    }
}
