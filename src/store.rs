use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::sync::RwLock;

/// The persisted store keys used by the core.
///
/// The names mirror what the browser shell persists under `localStorage`, so
/// a record written by either side stays readable by the other.
pub mod keys {
    /// The whole-record site content snapshot.
    pub const SITE_CONTENT: &str = "arantesSiteConfig";
    /// The encrypted admin session token.
    pub const AUTH_TOKEN: &str = "adminAuthToken";
    /// Timestamp of the last recorded session activity.
    pub const LOGIN_TIME: &str = "loginTime";
    /// Consecutive failed login attempt count.
    pub const LOGIN_ATTEMPTS: &str = "loginAttempts";
    /// Timestamp of the most recent failed attempt.
    pub const LAST_ATTEMPT_TIME: &str = "lastAttemptTime";
    /// The encrypted security event log.
    pub const SECURITY_LOGS: &str = "securityLogs";
}

/// A string key-value store with the semantics of browser local storage.
///
/// Reads and writes are synchronous; concurrent writers follow
/// last-write-wins. Implementations may fail transiently (quota, corrupt
/// medium) — callers fall back to defaults rather than propagate.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key` and its value, if present.
    fn remove(&self, key: &str) -> Result<()>;
}

/// An in-memory `KeyValueStore`.
///
/// The default backing store for tests and for embedding the core outside a
/// browser shell.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::Storage("store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::Storage("store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::Storage("store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v1").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v1"));

        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
