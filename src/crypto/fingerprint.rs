use crate::crypto::aes::{KEY_SIZE, SecureKey};
use sha2::{Digest, Sha256};

/// Length of the rendered fingerprint in hex characters.
const FINGERPRINT_LEN: usize = 32;

/// Characteristics of the client runtime used to bind a session to "this"
/// browser profile.
///
/// The fingerprint derived from these values is a best-effort binding, not a
/// security boundary: anyone running the same code in the same environment
/// can reproduce it. A browser upgrade or a resized virtual screen changes
/// the fingerprint and invalidates the session (see the audit log's tamper
/// probe for the consequence).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserEnvironment {
    /// The full user-agent string.
    pub user_agent: String,
    /// The UI locale, e.g. `pt-BR`.
    pub language: String,
    /// Screen width in CSS pixels.
    pub screen_width: u32,
    /// Screen height in CSS pixels.
    pub screen_height: u32,
    /// Timezone offset from UTC in minutes.
    pub timezone_offset_minutes: i32,
    /// Hash of the canvas rendering probe.
    pub canvas_hash: String,
}

impl BrowserEnvironment {
    /// Derives the opaque fingerprint for this environment.
    ///
    /// The characteristics are joined with `|` and reduced through SHA-256;
    /// the first 32 hex characters form the fingerprint.
    pub fn fingerprint(&self) -> String {
        let joined = format!(
            "{}|{}|{}x{}|{}|{}",
            self.user_agent,
            self.language,
            self.screen_width,
            self.screen_height,
            self.timezone_offset_minutes,
            self.canvas_hash,
        );

        let digest = Sha256::digest(joined.as_bytes());
        let mut rendered = hex::encode(digest);
        rendered.truncate(FINGERPRINT_LEN);
        rendered
    }
}

impl Default for BrowserEnvironment {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/128.0".to_string(),
            language: "pt-BR".to_string(),
            screen_width: 1920,
            screen_height: 1080,
            timezone_offset_minutes: 180,
            canvas_hash: "data:image/png;base64,iVBORw0KGgo".to_string(),
        }
    }
}

/// Derives the symmetric session key for a fingerprint.
///
/// SHA-256 of the fingerprint string; fast on purpose, since every log-entry
/// read re-derives it. Obfuscation, not confidentiality — the fingerprint is
/// derivable by any code running in the same environment.
pub fn session_key(fingerprint: &str) -> SecureKey {
    let digest = Sha256::digest(fingerprint.as_bytes());
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&digest);
    SecureKey::new(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_fixed_length() {
        let env = BrowserEnvironment::default();
        let fp = env.fingerprint();
        assert_eq!(fp.len(), 32);
        assert_eq!(fp, env.fingerprint());
    }

    #[test]
    fn any_characteristic_change_alters_the_fingerprint() {
        let base = BrowserEnvironment::default();
        let mut upgraded = base.clone();
        upgraded.user_agent = "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/129.0".into();

        assert_ne!(base.fingerprint(), upgraded.fingerprint());
    }

    #[test]
    fn session_keys_differ_per_fingerprint() {
        let a = session_key("aaaa");
        let b = session_key("bbbb");
        assert_ne!(a.as_bytes(), b.as_bytes());
    }
}
