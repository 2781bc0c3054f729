//! User directory trait.
//!
//! User identity (profile, credentials, enrollment flags) is owned by an
//! external collaborator; this core reads the handful of fields it needs
//! and delegates password verification to the directory's own hasher.

use crate::error::Result;
use crate::state::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The slice of a user record the session core needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub user_id: UserId,

    /// Email address; delivery target for emailed codes.
    pub email: String,

    /// Login name.
    pub username: String,

    /// Deactivated accounts cannot log in or refresh.
    pub is_active: bool,

    /// User has enrolled in MFA.
    pub mfa_enabled: bool,

    /// Base32 TOTP secret, present once an authenticator is enrolled.
    pub totp_secret: Option<String>,

    /// The directory wants this account's password rotated.
    pub requires_password_change: bool,

    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

/// User directory.
///
/// Lookup and password verification against the external user store.
pub trait UserDirectory: Send + Sync {
    /// Find a user by id.
    ///
    /// # Errors
    ///
    /// Returns error if the directory query fails.
    fn find_by_id(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<User>>> + Send;

    /// Find a user by username or email.
    ///
    /// # Errors
    ///
    /// Returns error if the directory query fails.
    fn find_by_login(
        &self,
        username_or_email: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>>> + Send;

    /// Verify a password against the directory's credential store.
    ///
    /// Hashing scheme and upgrade policy belong to the directory; callers
    /// only see accept/reject.
    ///
    /// # Errors
    ///
    /// Returns error if the credential store is unreachable.
    fn verify_password(
        &self,
        user_id: UserId,
        password: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}
