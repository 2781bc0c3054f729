//! Brute-force attempt tracking with lockout.
//!
//! One counter per `(user, verification kind)`: a lockout on TOTP does not
//! block backup-code attempts and vice versa. The counter mutation itself
//! is delegated to the store's atomic `record_failure` so concurrent
//! failures cannot race past the threshold.

use crate::config::AuthConfig;
use crate::error::Result;
use crate::providers::{AttemptState, AttemptStore, Clock};
use crate::state::{UserId, VerificationKind};

/// Sliding-window failure counter with lockout.
#[derive(Debug, Clone)]
pub struct AttemptTracker<S, C> {
    store: S,
    clock: C,
    config: AuthConfig,
}

impl<S, C> AttemptTracker<S, C>
where
    S: AttemptStore,
    C: Clock,
{
    /// Create a tracker over the given store and clock.
    pub const fn new(store: S, clock: C, config: AuthConfig) -> Self {
        Self { store, clock, config }
    }

    /// Whether this `(user, kind)` path is currently locked out.
    ///
    /// # Errors
    ///
    /// Returns error if the attempt store fails.
    pub async fn is_locked_out(&self, user_id: UserId, kind: VerificationKind) -> Result<bool> {
        let now = self.clock.now();
        Ok(self
            .store
            .get(user_id, kind)
            .await?
            .and_then(|counter| counter.locked_until)
            .is_some_and(|until| now < until))
    }

    /// Record one failed attempt; locks the path when the threshold is
    /// crossed.
    ///
    /// # Errors
    ///
    /// Returns error if the attempt store fails.
    pub async fn record_failed_attempt(
        &self,
        user_id: UserId,
        kind: VerificationKind,
    ) -> Result<AttemptState> {
        let state = self
            .store
            .record_failure(
                user_id,
                kind,
                self.clock.now(),
                self.config.attempt_window,
                self.config.max_failed_attempts,
                self.config.lockout_duration,
            )
            .await?;

        if state.just_locked {
            tracing::warn!(
                user_id = %user_id.0,
                kind = kind.as_str(),
                failures = state.failures,
                "verification path locked out"
            );
        }
        Ok(state)
    }

    /// Clear the counter after a successful verification.
    ///
    /// # Errors
    ///
    /// Returns error if the attempt store fails.
    pub async fn reset_attempts(&self, user_id: UserId, kind: VerificationKind) -> Result<()> {
        self.store.reset(user_id, kind).await
    }
}
