//! Session and MFA policy configuration.
//!
//! All expiry, lockout, and method-preference policy lives here so the
//! embedding application can tune it. Values should be provided by the
//! application, not hardcoded at call sites.

use crate::state::MfaMethod;
use chrono::Duration;

/// Policy knobs for the session lifecycle and MFA state machine.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Access-token lifetime.
    ///
    /// Default: 15 minutes
    pub access_token_ttl: Duration,

    /// Per-link refresh-token lifetime. Short; freshness comes from
    /// rotation, not from long-lived links.
    ///
    /// Default: 7 days
    pub refresh_token_ttl: Duration,

    /// Absolute session ceiling measured from first login, independent of
    /// rotation frequency.
    ///
    /// Default: 30 days
    pub session_ceiling: Duration,

    /// MFA challenge (and emailed code) lifetime.
    ///
    /// Default: 5 minutes
    pub challenge_ttl: Duration,

    /// Digits in the emailed one-time code.
    ///
    /// Default: 6
    pub email_code_digits: u32,

    /// TOTP time step in seconds (RFC 6238).
    ///
    /// Default: 30
    pub totp_step_seconds: u64,

    /// Accepted TOTP steps either side of the current one.
    ///
    /// Default: 1
    pub totp_skew_steps: u64,

    /// Digits in a TOTP code.
    ///
    /// Default: 6
    pub totp_digits: u32,

    /// Failed attempts per `(user, kind)` before lockout.
    ///
    /// Default: 5
    pub max_failed_attempts: u32,

    /// Sliding window over which failures are counted.
    ///
    /// Default: 15 minutes
    pub attempt_window: Duration,

    /// How long a locked-out path stays locked.
    ///
    /// Default: 15 minutes
    pub lockout_duration: Duration,

    /// Trusted-device bypass lifetime.
    ///
    /// Default: 30 days
    pub trusted_device_ttl: Duration,

    /// Require a second factor for every user, regardless of per-user
    /// enrollment.
    ///
    /// Default: false
    pub mfa_required_for_all: bool,

    /// Challenge-method preference, most preferred first. The issued method
    /// is the first entry the user can satisfy. [`MfaMethod::BackupCode`]
    /// entries are ignored here; backup codes are a verify-time alternative
    /// only.
    ///
    /// Default: `[Totp, EmailCode]`
    pub method_preference: Vec<MfaMethod>,

    /// `iss` claim stamped into access tokens.
    ///
    /// Default: `"keystone-auth"`
    pub token_issuer: String,
}

impl AuthConfig {
    /// Create a configuration with the documented defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
            session_ceiling: Duration::days(30),
            challenge_ttl: Duration::minutes(5),
            email_code_digits: 6,
            totp_step_seconds: 30,
            totp_skew_steps: 1,
            totp_digits: 6,
            max_failed_attempts: 5,
            attempt_window: Duration::minutes(15),
            lockout_duration: Duration::minutes(15),
            trusted_device_ttl: Duration::days(30),
            mfa_required_for_all: false,
            method_preference: vec![MfaMethod::Totp, MfaMethod::EmailCode],
            token_issuer: "keystone-auth".to_string(),
        }
    }

    /// Set the refresh-token per-link lifetime.
    #[must_use]
    pub const fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    /// Set the absolute session ceiling.
    #[must_use]
    pub const fn with_session_ceiling(mut self, ceiling: Duration) -> Self {
        self.session_ceiling = ceiling;
        self
    }

    /// Set the access-token lifetime.
    #[must_use]
    pub const fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    /// Set the challenge lifetime.
    #[must_use]
    pub const fn with_challenge_ttl(mut self, ttl: Duration) -> Self {
        self.challenge_ttl = ttl;
        self
    }

    /// Set the lockout threshold.
    #[must_use]
    pub const fn with_max_failed_attempts(mut self, attempts: u32) -> Self {
        self.max_failed_attempts = attempts;
        self
    }

    /// Set the lockout duration.
    #[must_use]
    pub const fn with_lockout_duration(mut self, duration: Duration) -> Self {
        self.lockout_duration = duration;
        self
    }

    /// Set the trusted-device bypass lifetime.
    #[must_use]
    pub const fn with_trusted_device_ttl(mut self, ttl: Duration) -> Self {
        self.trusted_device_ttl = ttl;
        self
    }

    /// Require a second factor for every user.
    #[must_use]
    pub const fn with_mfa_required_for_all(mut self, required: bool) -> Self {
        self.mfa_required_for_all = required;
        self
    }

    /// Set the challenge-method preference order.
    #[must_use]
    pub fn with_method_preference(mut self, preference: Vec<MfaMethod>) -> Self {
        self.method_preference = preference;
        self
    }

    /// Set the access-token issuer claim.
    #[must_use]
    pub fn with_token_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.token_issuer = issuer.into();
        self
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.access_token_ttl, Duration::minutes(15));
        assert_eq!(config.refresh_token_ttl, Duration::days(7));
        assert_eq!(config.session_ceiling, Duration::days(30));
        assert_eq!(config.max_failed_attempts, 5);
        assert_eq!(
            config.method_preference,
            vec![MfaMethod::Totp, MfaMethod::EmailCode]
        );
        assert!(!config.mfa_required_for_all);
    }

    #[test]
    fn builder_overrides() {
        let config = AuthConfig::new()
            .with_refresh_token_ttl(Duration::days(1))
            .with_session_ceiling(Duration::days(7))
            .with_max_failed_attempts(3)
            .with_lockout_duration(Duration::minutes(5))
            .with_mfa_required_for_all(true)
            .with_method_preference(vec![MfaMethod::EmailCode])
            .with_token_issuer("example-issuer");

        assert_eq!(config.refresh_token_ttl, Duration::days(1));
        assert_eq!(config.session_ceiling, Duration::days(7));
        assert_eq!(config.max_failed_attempts, 3);
        assert_eq!(config.lockout_duration, Duration::minutes(5));
        assert!(config.mfa_required_for_all);
        assert_eq!(config.method_preference, vec![MfaMethod::EmailCode]);
        assert_eq!(config.token_issuer, "example-issuer");
    }
}
