//! MFA challenge orchestration.
//!
//! A challenge is short-lived proof that password authentication succeeded,
//! issued when a second factor is required and consumed exactly once by a
//! successful verification. Verification follows one fixed sequence for
//! every method: resolve the challenge, gate on lockout, check the
//! credential, record failures, and only then consume.

use crate::attempts::AttemptTracker;
use crate::config::AuthConfig;
use crate::crypto;
use crate::devices::TrustedDeviceRegistry;
use crate::error::Result;
use crate::providers::{
    AttemptStore, AuditSink, BackupCodeStore, ChallengeStore, Clock, Notifier, SecurityEvent,
    SecurityEventKind, TrustedDeviceStore, User, UserDirectory,
};
use crate::state::{
    ChallengeIssued, MfaChallenge, MfaMethod, UserId, VerificationKind, VerificationOutcome,
};
use crate::totp;
use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// Issues challenges, verifies second factors, and arbitrates
/// trusted-device bypass.
pub struct ChallengeOrchestrator<U, CS, BS, TS, DS, N, C, A> {
    directory: U,
    challenges: CS,
    backup_codes: BS,
    attempts: AttemptTracker<TS, C>,
    devices: TrustedDeviceRegistry<DS, C, A>,
    notifier: N,
    clock: C,
    audit: A,
    config: AuthConfig,
}

impl<U, CS, BS, TS, DS, N, C, A> ChallengeOrchestrator<U, CS, BS, TS, DS, N, C, A>
where
    U: UserDirectory,
    CS: ChallengeStore,
    BS: BackupCodeStore,
    TS: AttemptStore,
    DS: TrustedDeviceStore,
    N: Notifier,
    C: Clock,
    A: AuditSink,
{
    /// Create an orchestrator over its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        directory: U,
        challenges: CS,
        backup_codes: BS,
        attempts: AttemptTracker<TS, C>,
        devices: TrustedDeviceRegistry<DS, C, A>,
        notifier: N,
        clock: C,
        audit: A,
        config: AuthConfig,
    ) -> Self {
        Self {
            directory,
            challenges,
            backup_codes,
            attempts,
            devices,
            notifier,
            clock,
            audit,
            config,
        }
    }

    /// The trusted-device registry this orchestrator arbitrates with.
    pub const fn devices(&self) -> &TrustedDeviceRegistry<DS, C, A> {
        &self.devices
    }

    /// The attempt tracker shared with the login flow.
    pub const fn attempts(&self) -> &AttemptTracker<TS, C> {
        &self.attempts
    }

    /// Whether a second factor is required before this user's sessions are
    /// trusted.
    #[must_use]
    pub fn is_mfa_required(&self, user: &User) -> bool {
        self.config.mfa_required_for_all || user.mfa_enabled
    }

    /// Issue a challenge for `user` and dispatch any out-of-band code.
    ///
    /// The issued method is the first entry of the configured preference
    /// order the user can satisfy; emailed codes fall back when nothing
    /// else is enrolled. Code dispatch failure is logged and the challenge
    /// stands — a flaky relay must not deny login outright.
    ///
    /// # Errors
    ///
    /// Returns error if the challenge or backup-code store fails.
    pub async fn issue_challenge(&self, user: &User, client_ip: IpAddr) -> Result<ChallengeIssued> {
        let now = self.clock.now();
        let method = self.select_method(user);
        let expires_at = now + self.config.challenge_ttl;

        let challenge_token = crypto::generate_opaque_token();
        let mut email_code = None;
        let email_code_hash = if method == MfaMethod::EmailCode {
            let code = crypto::generate_numeric_code(self.config.email_code_digits);
            let hash = crypto::hash_secret(&code);
            email_code = Some(code);
            Some(hash)
        } else {
            None
        };

        self.challenges
            .put(
                &crypto::hash_secret(&challenge_token),
                MfaChallenge {
                    user_id: user.user_id,
                    method,
                    email_code_hash,
                    created_at: now,
                    expires_at,
                    consumed: false,
                },
            )
            .await?;

        if let Some(code) = email_code {
            let expiry_minutes = self.config.challenge_ttl.num_minutes();
            if let Err(e) = self.notifier.send_mfa_code(&user.email, &code, expiry_minutes).await {
                tracing::warn!(user_id = %user.user_id.0, error = %e, "MFA code dispatch failed");
            }
        }

        self.audit
            .log_security_event(SecurityEvent {
                kind: SecurityEventKind::ChallengeIssued,
                user_id: Some(user.user_id),
                client_ip: Some(client_ip),
                success: true,
                detail: Some(method.as_str().to_string()),
                at: now,
            })
            .await;

        Ok(ChallengeIssued {
            challenge_token,
            method,
            allowed_methods: self.allowed_methods(user).await?,
            expires_at,
        })
    }

    /// Verify an emailed one-time code.
    ///
    /// # Errors
    ///
    /// Returns error if a backing store fails.
    pub async fn verify_email_code(
        &self,
        challenge_token: &str,
        code: &str,
        client_ip: IpAddr,
    ) -> Result<VerificationOutcome> {
        let now = self.clock.now();
        let Some((token_hash, challenge)) = self.load_challenge(challenge_token, now).await? else {
            return Ok(VerificationOutcome::InvalidOrExpired);
        };
        // Only a challenge issued for email carries a code hash.
        let Some(code_hash) = challenge.email_code_hash.clone() else {
            return Ok(VerificationOutcome::InvalidOrExpired);
        };

        if self.attempts.is_locked_out(challenge.user_id, VerificationKind::EmailCode).await? {
            return self
                .verification_rejected(&challenge, MfaMethod::EmailCode, client_ip, now)
                .await;
        }

        let matches = constant_time_eq::constant_time_eq(
            crypto::hash_secret(code).as_bytes(),
            code_hash.as_bytes(),
        );
        if !matches {
            return self
                .verification_failed(&challenge, MfaMethod::EmailCode, client_ip, now)
                .await;
        }

        self.finish_verification(&token_hash, &challenge, MfaMethod::EmailCode, client_ip, now)
            .await
    }

    /// Verify a TOTP code against the user's enrolled authenticator.
    ///
    /// # Errors
    ///
    /// Returns error if a backing store or the directory fails.
    pub async fn verify_totp(
        &self,
        challenge_token: &str,
        code: &str,
        client_ip: IpAddr,
    ) -> Result<VerificationOutcome> {
        let now = self.clock.now();
        let Some((token_hash, challenge)) = self.load_challenge(challenge_token, now).await? else {
            return Ok(VerificationOutcome::InvalidOrExpired);
        };

        // TOTP is self-provisioned: the secret lives with the user, not the
        // challenge, so any challenge for an enrolled user accepts it.
        let secret = match self.directory.find_by_id(challenge.user_id).await? {
            Some(user) => user.totp_secret,
            None => return Ok(VerificationOutcome::InvalidOrExpired),
        };
        let Some(secret) = secret else {
            return Ok(VerificationOutcome::InvalidOrExpired);
        };

        if self.attempts.is_locked_out(challenge.user_id, VerificationKind::Totp).await? {
            return self
                .verification_rejected(&challenge, MfaMethod::Totp, client_ip, now)
                .await;
        }

        let valid = totp::verify_code(
            &secret,
            code,
            now.timestamp(),
            self.config.totp_step_seconds,
            self.config.totp_skew_steps,
            self.config.totp_digits,
        );
        if !valid {
            return self
                .verification_failed(&challenge, MfaMethod::Totp, client_ip, now)
                .await;
        }

        self.finish_verification(&token_hash, &challenge, MfaMethod::Totp, client_ip, now)
            .await
    }

    /// Verify a single-use backup code.
    ///
    /// # Errors
    ///
    /// Returns error if a backing store fails.
    pub async fn verify_backup_code(
        &self,
        challenge_token: &str,
        code: &str,
        client_ip: IpAddr,
    ) -> Result<VerificationOutcome> {
        let now = self.clock.now();
        let Some((token_hash, challenge)) = self.load_challenge(challenge_token, now).await? else {
            return Ok(VerificationOutcome::InvalidOrExpired);
        };

        if self.attempts.is_locked_out(challenge.user_id, VerificationKind::BackupCode).await? {
            return self
                .verification_rejected(&challenge, MfaMethod::BackupCode, client_ip, now)
                .await;
        }

        let presented_hash = crypto::hash_secret(code);
        let mut matched = None;
        for candidate in self.backup_codes.find_unused(challenge.user_id).await? {
            // Compare every candidate; no early exit on match.
            if constant_time_eq::constant_time_eq(
                presented_hash.as_bytes(),
                candidate.code_hash.as_bytes(),
            ) && matched.is_none()
            {
                matched = Some(candidate);
            }
        }

        let Some(matched) = matched else {
            return self
                .verification_failed(&challenge, MfaMethod::BackupCode, client_ip, now)
                .await;
        };

        // Burn the code before consuming the challenge: losing the burn
        // race means another caller already spent this code, and a spent
        // code never revalidates.
        let burned = self
            .backup_codes
            .consume_code(challenge.user_id, &matched.code_hash, now)
            .await?;
        if !burned {
            return self
                .verification_failed(&challenge, MfaMethod::BackupCode, client_ip, now)
                .await;
        }

        self.finish_verification(&token_hash, &challenge, MfaMethod::BackupCode, client_ip, now)
            .await
    }

    /// Attempt to skip the challenge step with a trusted-device token.
    ///
    /// # Errors
    ///
    /// Returns error if the device store fails.
    pub async fn try_bypass_trusted_device(
        &self,
        user: &User,
        device_token: &str,
        user_agent: &str,
        client_ip: IpAddr,
    ) -> Result<bool> {
        self.devices
            .validate(user.user_id, device_token, user_agent, client_ip)
            .await
    }

    /// Every method this user may verify with right now.
    ///
    /// # Errors
    ///
    /// Returns error if the backup-code store fails.
    pub async fn allowed_methods(&self, user: &User) -> Result<Vec<MfaMethod>> {
        let mut methods = self.enrolled_methods(user);
        if self.backup_codes.has_unused(user.user_id).await? {
            methods.push(MfaMethod::BackupCode);
        }
        Ok(methods)
    }

    /// Enrolled challenge methods in preference order.
    fn enrolled_methods(&self, user: &User) -> Vec<MfaMethod> {
        let mut methods = Vec::new();
        for method in &self.config.method_preference {
            let satisfied = match method {
                MfaMethod::Totp => user.totp_secret.is_some(),
                MfaMethod::EmailCode => true,
                // Backup codes are never an issued method.
                MfaMethod::BackupCode => false,
            };
            if satisfied && !methods.contains(method) {
                methods.push(*method);
            }
        }
        if methods.is_empty() {
            methods.push(MfaMethod::EmailCode);
        }
        methods
    }

    fn select_method(&self, user: &User) -> MfaMethod {
        // enrolled_methods never returns an empty list.
        self.enrolled_methods(user)[0]
    }

    async fn load_challenge(
        &self,
        challenge_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(String, MfaChallenge)>> {
        let token_hash = crypto::hash_secret(challenge_token);
        match self.challenges.get(&token_hash).await? {
            Some(challenge) if !challenge.consumed && !challenge.is_expired(now) => {
                Ok(Some((token_hash, challenge)))
            }
            _ => Ok(None),
        }
    }

    /// Lockout-gated rejection: the credential was never examined.
    async fn verification_rejected(
        &self,
        challenge: &MfaChallenge,
        method: MfaMethod,
        client_ip: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<VerificationOutcome> {
        self.log_verification(challenge.user_id, method, client_ip, now, false, "locked_out")
            .await;
        Ok(VerificationOutcome::TooManyAttempts)
    }

    /// Wrong credential: count the failure, then reject.
    async fn verification_failed(
        &self,
        challenge: &MfaChallenge,
        method: MfaMethod,
        client_ip: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<VerificationOutcome> {
        self.attempts
            .record_failed_attempt(challenge.user_id, method.into())
            .await?;
        self.log_verification(challenge.user_id, method, client_ip, now, false, "invalid_code")
            .await;
        Ok(VerificationOutcome::InvalidCode)
    }

    /// Correct credential: reset the counter and consume the challenge
    /// atomically. Losing the consume race downgrades to invalid-token —
    /// the challenge authorized exactly one session and it was not ours.
    async fn finish_verification(
        &self,
        token_hash: &str,
        challenge: &MfaChallenge,
        method: MfaMethod,
        client_ip: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<VerificationOutcome> {
        self.attempts.reset_attempts(challenge.user_id, method.into()).await?;

        if self.challenges.consume(token_hash, now).await?.is_none() {
            return Ok(VerificationOutcome::InvalidOrExpired);
        }

        self.log_verification(challenge.user_id, method, client_ip, now, true, "verified")
            .await;
        Ok(VerificationOutcome::Verified { user_id: challenge.user_id })
    }

    async fn log_verification(
        &self,
        user_id: UserId,
        method: MfaMethod,
        client_ip: IpAddr,
        now: DateTime<Utc>,
        success: bool,
        detail: &str,
    ) {
        self.audit
            .log_security_event(SecurityEvent {
                kind: SecurityEventKind::ChallengeVerified,
                user_id: Some(user_id),
                client_ip: Some(client_ip),
                success,
                detail: Some(format!("{}:{detail}", method.as_str())),
                at: now,
            })
            .await;
    }
}
