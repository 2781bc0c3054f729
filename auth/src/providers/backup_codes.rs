//! Backup-code store trait.
//!
//! Batch generation of codes is out of scope; this core only consumes
//! them, one at a time, each at most once.

use crate::error::Result;
use crate::state::{BackupCode, UserId};
use chrono::{DateTime, Utc};

/// Backup recovery-code store.
pub trait BackupCodeStore: Send + Sync {
    /// All codes for a user that have not been consumed yet.
    ///
    /// Returned hashes are matched engine-side in constant time.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn find_unused(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Vec<BackupCode>>> + Send;

    /// Atomically mark one code used.
    ///
    /// # Returns
    ///
    /// `true` iff this call flipped the code from unused to used. A second
    /// caller racing on the same code gets `false` — once used, a code
    /// never revalidates.
    ///
    /// # Errors
    ///
    /// Returns error only on storage failures.
    fn consume_code(
        &self,
        user_id: UserId,
        code_hash: &str,
        used_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Whether the user has at least one unused code.
    ///
    /// Drives whether backup codes appear in a challenge's allowed-method
    /// list.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn has_unused(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}
