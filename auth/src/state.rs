//! Core state types for the session and MFA subsystem.
//!
//! Everything the stores persist and everything the public flows return is
//! defined here. All types are `Clone` and serde-serializable so store
//! implementations can persist them however they like.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for a user.
///
/// User identity itself is owned by the external user directory; this core
/// only references users by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    /// Generate a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a refresh-token family.
///
/// Every token descended from one login shares a family id; the family is
/// the unit of revocation when reuse is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FamilyId(pub uuid::Uuid);

impl FamilyId {
    /// Generate a new random `FamilyId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for FamilyId {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// MFA Methods
// ═══════════════════════════════════════════════════════════════════════

/// Second-factor verification method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MfaMethod {
    /// Short numeric code delivered out-of-band to the user's email.
    EmailCode,

    /// Time-based one-time password (RFC 6238).
    Totp,

    /// One of a fixed set of single-use recovery codes.
    ///
    /// Never the *issued* method of a challenge — always an alternate path
    /// the client may choose at verify time.
    BackupCode,
}

impl MfaMethod {
    /// Stable string form for logging and audit records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EmailCode => "email_code",
            Self::Totp => "totp",
            Self::BackupCode => "backup_code",
        }
    }
}

/// The kind of credential an attempt counter tracks.
///
/// One counter per `(user, kind)` so a lockout on one path never blocks
/// another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationKind {
    /// Primary password verification at login.
    Password,

    /// Emailed one-time code.
    EmailCode,

    /// TOTP code.
    Totp,

    /// Backup recovery code.
    BackupCode,
}

impl VerificationKind {
    /// Stable string form for logging and audit records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::EmailCode => "email_code",
            Self::Totp => "totp",
            Self::BackupCode => "backup_code",
        }
    }
}

impl From<MfaMethod> for VerificationKind {
    fn from(method: MfaMethod) -> Self {
        match method {
            MfaMethod::EmailCode => Self::EmailCode,
            MfaMethod::Totp => Self::Totp,
            MfaMethod::BackupCode => Self::BackupCode,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Stored Records
// ═══════════════════════════════════════════════════════════════════════

/// One link in a refresh-token rotation chain.
///
/// The presented token is never stored; only its SHA-256 hash. At most one
/// record per family is *active* (not revoked, not expired) at any time —
/// rotation atomically revokes the old record and inserts its successor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Opaque record identifier.
    pub id: uuid::Uuid,

    /// SHA-256 hash of the presented token.
    pub token_hash: String,

    /// Rotation-chain family this token belongs to.
    pub family_id: FamilyId,

    /// Owning user.
    pub user_id: UserId,

    /// When this link was created (login or rotation).
    pub issued_at: DateTime<Utc>,

    /// Per-link expiry. Short; freshness comes from rotation.
    pub expires_at: DateTime<Utc>,

    /// When the family was created. Fixed across rotations; enforces the
    /// absolute session ceiling independent of per-link freshness.
    pub session_started_at: DateTime<Utc>,

    /// Set when this link is rotated away or the family is revoked.
    pub revoked_at: Option<DateTime<Utc>>,

    /// Client address that created this link.
    pub created_by_ip: IpAddr,
}

impl RefreshTokenRecord {
    /// `true` once this link has been rotated away or revoked.
    #[must_use]
    pub const fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// `true` once the per-link expiry has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Ephemeral proof that password authentication succeeded.
///
/// Keyed in the challenge store by the SHA-256 hash of the opaque challenge
/// token handed to the client. Consumable exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MfaChallenge {
    /// User this challenge gates.
    pub user_id: UserId,

    /// The method the challenge was issued for.
    pub method: MfaMethod,

    /// SHA-256 hash of the emailed code. Present only when `method` is
    /// [`MfaMethod::EmailCode`].
    pub email_code_hash: Option<String>,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Expiry (minutes-scale).
    pub expires_at: DateTime<Utc>,

    /// Set on successful verification; a consumed challenge never
    /// validates again.
    pub consumed: bool,
}

impl MfaChallenge {
    /// `true` once the challenge expiry has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// One single-use recovery code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupCode {
    /// Owning user.
    pub user_id: UserId,

    /// SHA-256 hash of the code.
    pub code_hash: String,

    /// Set when the code is consumed. Once set, the code never
    /// revalidates.
    pub used_at: Option<DateTime<Utc>>,
}

impl BackupCode {
    /// `true` until the code has been consumed.
    #[must_use]
    pub const fn is_unused(&self) -> bool {
        self.used_at.is_none()
    }
}

/// A long-lived MFA-bypass credential bound to one user and one device
/// profile.
///
/// Validity requires both the token hash and the fingerprint to match; a
/// stolen cookie presented from a different network or device fails closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustedDevice {
    /// Owning user.
    pub user_id: UserId,

    /// SHA-256 hash of the device token.
    pub token_hash: String,

    /// SHA-256 over the user agent and the truncated client address.
    pub fingerprint: String,

    /// Enrollment time.
    pub created_at: DateTime<Utc>,

    /// Bypass expiry; after this the device must complete MFA again.
    pub expires_at: DateTime<Utc>,

    /// Last successful bypass.
    pub last_used_at: DateTime<Utc>,
}

/// Failure counter for one `(user, verification kind)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCounter {
    /// Failures recorded in the current window.
    pub failures: u32,

    /// When the current counting window opened.
    pub window_started_at: DateTime<Utc>,

    /// Set once the threshold is crossed; attempts are rejected until then.
    pub locked_until: Option<DateTime<Utc>>,
}

// ═══════════════════════════════════════════════════════════════════════
// Outcomes
// ═══════════════════════════════════════════════════════════════════════

/// Token material issued for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedTokens {
    /// Signed access token (JWT, minutes-scale lifetime).
    pub access_token: String,

    /// Opaque refresh token. Single-use; exchanged on every refresh.
    pub refresh_token: String,

    /// The rotation family these tokens belong to.
    pub family_id: FamilyId,

    /// Owning user.
    pub user_id: UserId,

    /// When the session (family) was first established.
    pub session_started_at: DateTime<Utc>,

    /// Access-token expiry.
    pub access_expires_at: DateTime<Utc>,
}

/// Result of presenting a refresh token for rotation.
#[derive(Debug, Clone, PartialEq)]
pub enum RotateOutcome {
    /// The presented token was active; it has been revoked and replaced.
    Rotated(IssuedTokens),

    /// The presented token was already rotated away — someone is replaying
    /// a stolen token. The whole family has been revoked.
    ReuseDetected,

    /// Unknown or expired token. Indistinguishable garbage from the
    /// caller's point of view.
    InvalidOrExpired,

    /// The family hit the absolute session ceiling. The caller must
    /// re-authenticate; silent refresh is not an option.
    SessionExpired,
}

/// Result of verifying a second factor against a challenge.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// Credential accepted; the challenge has been consumed.
    Verified {
        /// The user the challenge was bound to.
        user_id: UserId,
    },

    /// Wrong code. A failed attempt has been recorded.
    InvalidCode,

    /// This verification path is locked out; the credential was not
    /// examined.
    TooManyAttempts,

    /// Challenge unknown, expired, or already consumed.
    InvalidOrExpired,
}

/// A challenge handed to the client after password authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeIssued {
    /// Opaque challenge token; presented back on verification.
    pub challenge_token: String,

    /// The method the challenge was issued for (codes were dispatched for
    /// this method if it needs them).
    pub method: MfaMethod,

    /// Every method the user may verify with, including alternate paths
    /// such as backup codes.
    pub allowed_methods: Vec<MfaMethod>,

    /// Challenge expiry.
    pub expires_at: DateTime<Utc>,
}

/// Coarse failure taxonomy exposed to callers.
///
/// Deliberately non-leaky: unknown user and wrong password are the same
/// variant, and no variant carries internal identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// Bad password or unknown user — intentionally indistinguishable.
    InvalidCredentials,

    /// The account exists but is deactivated.
    AccountInactive,

    /// Challenge or refresh token not found, expired, or already used.
    InvalidOrExpiredToken,

    /// An already-rotated refresh token was replayed. The session family
    /// has been revoked.
    ReuseDetected,

    /// Too many failed attempts; this path is locked out.
    TooManyAttempts,

    /// Wrong MFA code, TOTP, or backup code.
    InvalidCode,

    /// Absolute session ceiling reached; full re-login required.
    SessionExpired,
}

impl FailureReason {
    /// Stable string form for logging and audit records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountInactive => "account_inactive",
            Self::InvalidOrExpiredToken => "invalid_or_expired_token",
            Self::ReuseDetected => "reuse_detected",
            Self::TooManyAttempts => "too_many_attempts",
            Self::InvalidCode => "invalid_code",
            Self::SessionExpired => "session_expired",
        }
    }
}

/// Result of the public `login` / `refresh_session` / `verify_challenge`
/// flows.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// Fully authenticated; session tokens issued.
    Success {
        /// Access and refresh tokens for the new or rotated session.
        tokens: IssuedTokens,

        /// Set when the caller asked to trust this device during MFA
        /// verification; store it client-side to skip future challenges.
        trusted_device_token: Option<String>,

        /// The directory requires a password rotation before this account
        /// should be considered healthy.
        requires_password_change: bool,
    },

    /// Password accepted but a second factor is required.
    MfaRequired(ChallengeIssued),

    /// Authentication failed; see the coarse reason.
    Failed(FailureReason),
}

impl AuthOutcome {
    /// `true` for the `Success` variant.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn id_generation_is_unique() {
        assert_ne!(UserId::new(), UserId::new());
        assert_ne!(FamilyId::new(), FamilyId::new());
    }

    #[test]
    fn refresh_token_expiry_and_revocation() {
        let now = Utc::now();
        let mut record = RefreshTokenRecord {
            id: uuid::Uuid::new_v4(),
            token_hash: "hash".to_string(),
            family_id: FamilyId::new(),
            user_id: UserId::new(),
            issued_at: now,
            expires_at: now + Duration::days(7),
            session_started_at: now,
            revoked_at: None,
            created_by_ip: "127.0.0.1".parse().unwrap(),
        };

        assert!(!record.is_revoked());
        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + Duration::days(8)));

        record.revoked_at = Some(now);
        assert!(record.is_revoked());
    }

    #[test]
    fn method_maps_to_verification_kind() {
        assert_eq!(
            VerificationKind::from(MfaMethod::EmailCode),
            VerificationKind::EmailCode
        );
        assert_eq!(VerificationKind::from(MfaMethod::Totp), VerificationKind::Totp);
        assert_eq!(
            VerificationKind::from(MfaMethod::BackupCode),
            VerificationKind::BackupCode
        );
    }

    #[test]
    fn backup_code_usage_flag() {
        let code = BackupCode {
            user_id: UserId::new(),
            code_hash: "hash".to_string(),
            used_at: None,
        };
        assert!(code.is_unused());

        let used = BackupCode {
            used_at: Some(Utc::now()),
            ..code
        };
        assert!(!used.is_unused());
    }
}
