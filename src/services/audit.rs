use crate::clock::Clock;
use crate::crypto::{aes, fingerprint::BrowserEnvironment, fingerprint::session_key};
use crate::models::session::{SecurityEvent, SecurityEventKind};
use crate::store::{KeyValueStore, keys};
use std::sync::Arc;

/// Maximum number of entries kept in the audit trail.
const LOG_CAPACITY: usize = 100;
/// How many leading entries the tamper probe samples.
const TAMPER_SAMPLE_SIZE: usize = 5;

/// Append-only, size-bounded, encrypted audit trail.
///
/// Each entry is serialized and encrypted individually under the current
/// fingerprint, then appended to a JSON array in the store; once the array
/// exceeds capacity the oldest entries are dropped. Logging never fails the
/// caller — storage problems are traced and swallowed.
#[derive(Clone)]
pub struct SecurityLog {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    environment: BrowserEnvironment,
}

impl SecurityLog {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        environment: BrowserEnvironment,
    ) -> Self {
        Self {
            store,
            clock,
            environment,
        }
    }

    /// Appends a security event, truncating the oldest entries past capacity.
    pub fn log_event(&self, kind: SecurityEventKind, details: Option<&str>) {
        let fingerprint = self.environment.fingerprint();
        let event = SecurityEvent {
            timestamp: self.clock.now(),
            event: kind,
            details: details.map(str::to_string),
            fingerprint: fingerprint.clone(),
        };

        let json = match sonic_rs::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Security event serialization failed: {}", e);
                return;
            }
        };

        let blob = match aes::seal(&session_key(&fingerprint), json.as_bytes()) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::error!("Security event encryption failed: {}", e);
                return;
            }
        };

        let mut entries = self.read_raw_entries();
        entries.push(blob);
        if entries.len() > LOG_CAPACITY {
            let excess = entries.len() - LOG_CAPACITY;
            entries.drain(..excess);
        }

        match sonic_rs::to_string(&entries) {
            Ok(serialized) => {
                if let Err(e) = self.store.set(keys::SECURITY_LOGS, &serialized) {
                    tracing::error!("Security log write failed: {}", e);
                }
            }
            Err(e) => tracing::error!("Security log serialization failed: {}", e),
        }

        tracing::debug!("Security event recorded: {}", kind);
    }

    /// Decrypts and returns the stored events, oldest first.
    ///
    /// Entries that no longer decrypt under the current fingerprint are
    /// silently dropped; they do not abort the read.
    pub fn read_events(&self) -> Vec<SecurityEvent> {
        let key = session_key(&self.environment.fingerprint());

        self.read_raw_entries()
            .iter()
            .filter_map(|blob| {
                let plaintext = aes::open(&key, blob).ok()?;
                sonic_rs::from_slice::<SecurityEvent>(&plaintext).ok()
            })
            .collect()
    }

    /// Probes the log prefix for entries that no longer decrypt.
    ///
    /// A heuristic, not a guarantee: a legitimate environment change (say, a
    /// browser upgrade) rotates the fingerprint and trips the probe exactly
    /// like real tampering would. The caller treats both as fatal to the
    /// session.
    pub fn detect_tampering(&self) -> bool {
        let entries = match self.store.get(keys::SECURITY_LOGS) {
            Ok(Some(raw)) => match sonic_rs::from_str::<Vec<String>>(&raw) {
                Ok(entries) => entries,
                Err(_) => return true,
            },
            Ok(None) => return false,
            Err(_) => return true,
        };

        let key = session_key(&self.environment.fingerprint());
        for blob in entries.iter().take(TAMPER_SAMPLE_SIZE) {
            let readable = aes::open(&key, blob)
                .ok()
                .and_then(|plain| sonic_rs::from_slice::<SecurityEvent>(&plain).ok());
            if readable.is_none() {
                tracing::warn!("Security log tamper probe failed to decrypt an entry");
                return true;
            }
        }

        false
    }

    fn read_raw_entries(&self) -> Vec<String> {
        match self.store.get(keys::SECURITY_LOGS) {
            Ok(Some(raw)) => sonic_rs::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Security log unreadable, starting fresh: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Security log store read failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    fn log_with(environment: BrowserEnvironment) -> (SecurityLog, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let log = SecurityLog::new(
            store.clone(),
            Arc::new(ManualClock::starting_now()),
            environment,
        );
        (log, store)
    }

    #[test]
    fn events_round_trip_in_insertion_order() {
        let (log, _store) = log_with(BrowserEnvironment::default());

        log.log_event(SecurityEventKind::InvalidCredentials, None);
        log.log_event(SecurityEventKind::SuccessfulLogin, Some("operador"));

        let events = log.read_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, SecurityEventKind::InvalidCredentials);
        assert_eq!(events[1].event, SecurityEventKind::SuccessfulLogin);
        assert_eq!(events[1].details.as_deref(), Some("operador"));
    }

    #[test]
    fn capacity_is_bounded_at_one_hundred() {
        let (log, _store) = log_with(BrowserEnvironment::default());

        for i in 0..150 {
            log.log_event(SecurityEventKind::ContentUpdated, Some(&i.to_string()));
        }

        let events = log.read_events();
        assert_eq!(events.len(), 100);
        // Oldest were dropped: the first surviving entry is number 50.
        assert_eq!(events[0].details.as_deref(), Some("50"));
        assert_eq!(events[99].details.as_deref(), Some("149"));
    }

    #[test]
    fn foreign_entries_are_dropped_from_reads() {
        let (log, store) = log_with(BrowserEnvironment::default());
        log.log_event(SecurityEventKind::SuccessfulLogin, None);

        let mut other_env = BrowserEnvironment::default();
        other_env.language = "en-US".to_string();
        let other = SecurityLog::new(
            store,
            Arc::new(ManualClock::starting_now()),
            other_env,
        );

        assert!(other.read_events().is_empty());
    }

    #[test]
    fn tamper_probe_flags_undecryptable_prefix() {
        let (log, store) = log_with(BrowserEnvironment::default());
        log.log_event(SecurityEventKind::SuccessfulLogin, None);
        assert!(!log.detect_tampering());

        // Overwrite the stored array with an entry sealed by no known key.
        store
            .set(keys::SECURITY_LOGS, "[\"bm90IGEgcmVhbCBlbnRyeQ==\"]")
            .unwrap();
        assert!(log.detect_tampering());
    }

    #[test]
    fn environment_change_is_indistinguishable_from_tampering() {
        // A browser upgrade rotates the fingerprint; the probe reports
        // tampering even though nothing was touched. Documented limitation.
        let (log, store) = log_with(BrowserEnvironment::default());
        log.log_event(SecurityEventKind::SuccessfulLogin, None);

        let mut upgraded = BrowserEnvironment::default();
        upgraded.user_agent = format!("{} 129.0", upgraded.user_agent);
        let after_upgrade = SecurityLog::new(
            store,
            Arc::new(ManualClock::starting_now()),
            upgraded,
        );

        assert!(after_upgrade.detect_tampering());
    }

    #[test]
    fn missing_log_is_not_tampering() {
        let (log, _store) = log_with(BrowserEnvironment::default());
        assert!(!log.detect_tampering());
    }
}
