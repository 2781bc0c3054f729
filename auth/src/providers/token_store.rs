//! Refresh-token store trait.
//!
//! Persistence for rotation chains. The contract that matters is
//! [`RefreshTokenStore::rotate_active`]: the revoke-old/insert-successor
//! swap is a single conditional update, so two concurrent rotations of the
//! same token resolve inside the store — exactly one caller observes
//! [`RotationUpdate::Rotated`].

use crate::error::Result;
use crate::state::{FamilyId, RefreshTokenRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of the conditional rotation update.
///
/// Replaces duplicate-key exception handling: the store reports which side
/// of the race the caller was on and the engine maps that to an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationUpdate {
    /// The presented token was still active; it is now revoked and the
    /// successor is in place.
    Rotated,

    /// The presented token exists but was already revoked — the caller
    /// lost the race or is replaying a stolen token.
    AlreadyConsumed,

    /// No token with that hash exists.
    NotFound,
}

/// Refresh-token store.
///
/// # Implementation Notes
///
/// - `rotate_active` MUST be atomic: revoke-if-active and insert-successor
///   either both happen or neither does. SQL:
///   `UPDATE ... SET revoked_at = $1 WHERE token_hash = $2 AND revoked_at
///   IS NULL`, check the affected-row count, insert the successor in the
///   same transaction. Non-atomic implementations let a stolen token be
///   rotated twice.
/// - Records are never deleted here; retention sweeps are external.
pub trait RefreshTokenStore: Send + Sync {
    /// Insert the first token of a new family.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn insert(
        &self,
        record: RefreshTokenRecord,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Look up a token by the hash of its presented form.
    ///
    /// Revoked and expired records are returned too — the engine needs to
    /// distinguish replay of a rotated token from plain garbage.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<RefreshTokenRecord>>> + Send;

    /// Atomically revoke the token with `old_hash` (iff still active) and
    /// insert `successor` in its family.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails; race outcomes are
    /// reported through [`RotationUpdate`], not errors.
    fn rotate_active(
        &self,
        old_hash: &str,
        successor: RefreshTokenRecord,
        revoked_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<RotationUpdate>> + Send;

    /// Revoke every token in a family. Idempotent.
    ///
    /// Returns the number of records newly revoked.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn revoke_family(
        &self,
        family_id: FamilyId,
        revoked_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;
}
