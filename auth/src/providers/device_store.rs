//! Trusted-device store trait.

use crate::error::Result;
use crate::state::{TrustedDevice, UserId};
use chrono::{DateTime, Utc};

/// Trusted-device store, keyed by `(user, token hash)`.
///
/// Devices are long-lived bypass credentials; validation logic (hash and
/// fingerprint matching, expiry) lives in the registry, the store only
/// persists.
pub trait TrustedDeviceStore: Send + Sync {
    /// Persist a newly enrolled device.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn insert(
        &self,
        device: TrustedDevice,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Look up a device by owner and token hash.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn find(
        &self,
        user_id: UserId,
        token_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<TrustedDevice>>> + Send;

    /// Update `last_used_at` after a successful bypass.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn touch(
        &self,
        user_id: UserId,
        token_hash: &str,
        last_used_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Remove one device. Returns `true` if a record was removed.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn revoke(
        &self,
        user_id: UserId,
        token_hash: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Remove every device for a user (account compromise response).
    ///
    /// Returns the number of devices removed.
    ///
    /// # Errors
    ///
    /// Returns error if the storage operation fails.
    fn revoke_all_for_user(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;
}
