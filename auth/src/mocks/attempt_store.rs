//! Mock attempt-counter store for testing.

use crate::error::Result;
use crate::providers::{AttemptState, AttemptStore};
use crate::state::{AttemptCounter, UserId, VerificationKind};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory attempt-counter store.
///
/// The whole increment-check-lock step runs under one mutex guard, so
/// concurrent failures are all counted and the threshold is crossed by
/// exactly one of them.
#[derive(Debug, Clone)]
pub struct MockAttemptStore {
    counters: Arc<Mutex<HashMap<(UserId, VerificationKind), AttemptCounter>>>,
}

impl MockAttemptStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for MockAttemptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptStore for MockAttemptStore {
    async fn record_failure(
        &self,
        user_id: UserId,
        kind: VerificationKind,
        now: DateTime<Utc>,
        attempt_window: Duration,
        max_failures: u32,
        lockout_duration: Duration,
    ) -> Result<AttemptState> {
        let mut counters = self.counters.lock().unwrap();
        let counter = counters
            .entry((user_id, kind))
            .or_insert_with(|| AttemptCounter {
                failures: 0,
                window_started_at: now,
                locked_until: None,
            });

        // Stale window (and any expired lock) restarts counting.
        if now - counter.window_started_at > attempt_window {
            counter.failures = 0;
            counter.window_started_at = now;
            counter.locked_until = None;
        }

        counter.failures += 1;
        let just_locked = counter.locked_until.is_none() && counter.failures >= max_failures;
        if just_locked {
            counter.locked_until = Some(now + lockout_duration);
        }

        Ok(AttemptState {
            failures: counter.failures,
            locked_until: counter.locked_until,
            just_locked,
        })
    }

    async fn get(
        &self,
        user_id: UserId,
        kind: VerificationKind,
    ) -> Result<Option<AttemptCounter>> {
        let counters = self.counters.lock().unwrap();
        Ok(counters.get(&(user_id, kind)).cloned())
    }

    async fn reset(&self, user_id: UserId, kind: VerificationKind) -> Result<()> {
        let mut counters = self.counters.lock().unwrap();
        counters.remove(&(user_id, kind));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn threshold_is_crossed_exactly_once() {
        let store = MockAttemptStore::new();
        let user = UserId::new();
        let now = Utc::now();
        let window = Duration::minutes(15);
        let lockout = Duration::minutes(15);

        let mut lock_events = 0;
        for _ in 0..5 {
            let state = store
                .record_failure(user, VerificationKind::Totp, now, window, 3, lockout)
                .await
                .unwrap();
            if state.just_locked {
                lock_events += 1;
            }
        }
        assert_eq!(lock_events, 1);
    }

    #[tokio::test]
    async fn counters_are_independent_per_kind() {
        let store = MockAttemptStore::new();
        let user = UserId::new();
        let now = Utc::now();
        let window = Duration::minutes(15);
        let lockout = Duration::minutes(15);

        store
            .record_failure(user, VerificationKind::Totp, now, window, 3, lockout)
            .await
            .unwrap();
        let email_state = store
            .record_failure(user, VerificationKind::EmailCode, now, window, 3, lockout)
            .await
            .unwrap();

        assert_eq!(email_state.failures, 1);
    }
}
