//! MFA challenge store trait.
//!
//! Challenges are ephemeral (minutes-scale TTL) and consumable exactly
//! once. Consumption MUST be atomic: two verifications racing on the same
//! challenge get exactly one success between them.

use crate::error::Result;
use crate::state::MfaChallenge;
use chrono::{DateTime, Utc};

/// MFA challenge store, keyed by the SHA-256 hash of the opaque challenge
/// token.
///
/// # Implementation Notes
///
/// - **Production**: any store with TTL semantics and an atomic
///   mark-if-unconsumed update (key-value with get-and-set, or SQL
///   `UPDATE ... WHERE consumed = false` + row count).
/// - **Testing**: mutex-guarded map.
pub trait ChallengeStore: Send + Sync {
    /// Store a freshly issued challenge.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn put(
        &self,
        token_hash: &str,
        challenge: MfaChallenge,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Read a challenge without consuming it.
    ///
    /// Used for the pre-checks (lockout gate, credential validation) that
    /// must not burn the challenge on failure.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn get(
        &self,
        token_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<MfaChallenge>>> + Send;

    /// Atomically consume a challenge.
    ///
    /// # Returns
    ///
    /// - `Some(challenge)` — it existed, was unconsumed and unexpired at
    ///   `now`, and is now marked consumed
    /// - `None` — missing, expired, or already consumed; the same return
    ///   for all three so callers cannot distinguish
    ///
    /// # Errors
    ///
    /// Returns error only on storage failures.
    fn consume(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Option<MfaChallenge>>> + Send;
}
