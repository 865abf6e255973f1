use crate::clock::Clock;
use crate::config::Config;
use crate::models::session::{BlockStatus, LoginAttemptState};
use crate::store::{KeyValueStore, keys};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Rate-limits login attempts per browser profile.
///
/// Failures accumulate until `max_attempts`, at which point every login
/// request is rejected for `block_duration` without touching credential
/// verification. Failed attempts during the lockout neither extend nor
/// re-trigger it. State persists through the injected store so it survives
/// reloads; concurrent tabs follow last-write-wins.
///
/// The counters are client-local: clearing the store resets them. Accepted
/// limitation of the design, not hardened here.
#[derive(Clone)]
pub struct AttemptLimiter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    block_duration: Duration,
}

impl AttemptLimiter {
    /// Creates a limiter over the given store and clock.
    pub fn new(config: &Config, store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            max_attempts: config.max_login_attempts,
            block_duration: config.block_duration,
        }
    }

    /// Records a failed attempt and returns the new state.
    pub fn record_failure(&self) -> LoginAttemptState {
        let mut state = self.read_state();
        state.count += 1;
        state.last_attempt = Some(self.clock.now());
        self.write_state(&state);

        if state.count >= self.max_attempts {
            tracing::warn!(
                "Login blocked after {} consecutive failures ({}s lockout)",
                state.count,
                self.block_duration.num_seconds()
            );
        } else {
            tracing::debug!("Failed login attempt {}/{}", state.count, self.max_attempts);
        }

        state
    }

    /// Resets the counter after a successful login.
    pub fn record_success(&self) {
        self.reset();
        tracing::debug!("Attempt counter reset after successful login");
    }

    /// Reports whether login requests are currently locked out.
    ///
    /// An expired window resets the counter as a side effect, so the next
    /// failure starts a fresh count.
    pub fn check_blocked(&self) -> BlockStatus {
        let state = self.read_state();

        let Some(last_attempt) = state.last_attempt else {
            return BlockStatus::clear();
        };

        let elapsed = self.clock.now() - last_attempt;
        if elapsed >= self.block_duration {
            self.reset();
            return BlockStatus::clear();
        }

        if state.count >= self.max_attempts {
            let remaining = (self.block_duration - elapsed).num_seconds();
            return BlockStatus {
                blocked: true,
                remaining_seconds: remaining.max(1),
            };
        }

        BlockStatus::clear()
    }

    /// Failures still tolerated before the lockout engages.
    pub fn attempts_remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.read_state().count)
    }

    fn read_state(&self) -> LoginAttemptState {
        let count = self
            .store
            .get(keys::LOGIN_ATTEMPTS)
            .unwrap_or_else(|e| {
                tracing::warn!("Attempt counter unreadable, assuming zero: {}", e);
                None
            })
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(0);

        let last_attempt = self
            .store
            .get(keys::LAST_ATTEMPT_TIME)
            .unwrap_or(None)
            .and_then(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            });

        LoginAttemptState {
            count,
            last_attempt,
        }
    }

    fn write_state(&self, state: &LoginAttemptState) {
        if let Err(e) = self
            .store
            .set(keys::LOGIN_ATTEMPTS, &state.count.to_string())
        {
            tracing::error!("Failed to persist attempt counter: {}", e);
        }
        if let Some(last) = state.last_attempt {
            if let Err(e) = self.store.set(keys::LAST_ATTEMPT_TIME, &last.to_rfc3339()) {
                tracing::error!("Failed to persist attempt timestamp: {}", e);
            }
        }
    }

    fn reset(&self) {
        let _ = self.store.remove(keys::LOGIN_ATTEMPTS);
        let _ = self.store.remove(keys::LAST_ATTEMPT_TIME);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    fn limiter() -> (AttemptLimiter, Arc<ManualClock>) {
        let config = Config::new("ops@example.com", "segredo-forte").unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryStore::new());
        (
            AttemptLimiter::new(&config, store, clock.clone()),
            clock,
        )
    }

    #[test]
    fn three_failures_engage_the_lockout() {
        let (limiter, _clock) = limiter();

        limiter.record_failure();
        limiter.record_failure();
        assert!(!limiter.check_blocked().blocked);

        let state = limiter.record_failure();
        assert_eq!(state.count, 3);

        let status = limiter.check_blocked();
        assert!(status.blocked);
        assert!(status.remaining_seconds > 0 && status.remaining_seconds <= 300);
    }

    #[test]
    fn lockout_expires_and_counter_resets() {
        let (limiter, clock) = limiter();

        for _ in 0..3 {
            limiter.record_failure();
        }
        assert!(limiter.check_blocked().blocked);

        clock.advance(Duration::seconds(301));
        let status = limiter.check_blocked();
        assert!(!status.blocked);
        assert_eq!(limiter.attempts_remaining(), 3);
    }

    #[test]
    fn stale_partial_failures_expire_too() {
        let (limiter, clock) = limiter();

        limiter.record_failure();
        clock.advance(Duration::seconds(400));
        assert!(!limiter.check_blocked().blocked);
        assert_eq!(limiter.attempts_remaining(), 3);
    }

    #[test]
    fn success_resets_at_any_point() {
        let (limiter, _clock) = limiter();

        limiter.record_failure();
        limiter.record_failure();
        limiter.record_success();
        assert_eq!(limiter.attempts_remaining(), 3);
    }

    #[test]
    fn corrupt_persisted_state_reads_as_idle() {
        let config = Config::new("ops@example.com", "segredo-forte").unwrap();
        let store = Arc::new(MemoryStore::new());
        store.set(keys::LOGIN_ATTEMPTS, "not-a-number").unwrap();
        store.set(keys::LAST_ATTEMPT_TIME, "corrupted").unwrap();

        let limiter =
            AttemptLimiter::new(&config, store, Arc::new(ManualClock::starting_now()));
        assert!(!limiter.check_blocked().blocked);
        assert_eq!(limiter.attempts_remaining(), 3);
    }
}
