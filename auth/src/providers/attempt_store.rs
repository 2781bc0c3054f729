//! Attempt-counter store trait.
//!
//! Counters are keyed by `(user, verification kind)`. The increment is a
//! conditional update executed inside the store: two failed attempts
//! racing on the same key must both be counted, and the threshold must be
//! crossed exactly once.

use crate::error::Result;
use crate::state::{AttemptCounter, UserId, VerificationKind};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Counter state after a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptState {
    /// Failures in the current window, including the one just recorded.
    pub failures: u32,

    /// Set when the threshold has been crossed.
    pub locked_until: Option<DateTime<Utc>>,

    /// `true` iff the failure just recorded is the one that crossed the
    /// threshold — the caller audits the lockout exactly once.
    pub just_locked: bool,
}

/// Attempt-counter store.
///
/// Policy (window, threshold, lockout duration) is passed in per call so
/// the whole increment-check-lock step can run atomically per key.
pub trait AttemptStore: Send + Sync {
    /// Record one failure and return the resulting state.
    ///
    /// Atomic per key: restart the window if `attempt_window` has elapsed
    /// since it opened, increment, and set `locked_until` to
    /// `now + lockout_duration` when the count reaches `max_failures`.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    #[allow(clippy::too_many_arguments)]
    fn record_failure(
        &self,
        user_id: UserId,
        kind: VerificationKind,
        now: DateTime<Utc>,
        attempt_window: Duration,
        max_failures: u32,
        lockout_duration: Duration,
    ) -> impl std::future::Future<Output = Result<AttemptState>> + Send;

    /// Read the counter for a key, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn get(
        &self,
        user_id: UserId,
        kind: VerificationKind,
    ) -> impl std::future::Future<Output = Result<Option<AttemptCounter>>> + Send;

    /// Clear the counter for a key (successful verification).
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn reset(
        &self,
        user_id: UserId,
        kind: VerificationKind,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
