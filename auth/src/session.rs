//! Public authentication flows.
//!
//! The facade composes the rotation engine and the challenge orchestrator
//! into the four operations an edge layer calls: `login`,
//! `refresh_session`, `verify_challenge`, and `revoke_session`. Every
//! outcome is a typed value; failures are deliberately coarse so callers
//! cannot enumerate accounts or distinguish which check rejected them.

use crate::challenge::ChallengeOrchestrator;
use crate::config::AuthConfig;
use crate::error::Result;
use crate::providers::{
    AttemptStore, AuditSink, BackupCodeStore, ChallengeStore, Clock, Notifier, RefreshTokenStore,
    SecurityEvent, SecurityEventKind, TrustedDeviceStore, UserDirectory,
};
use crate::rotation::TokenRotationEngine;
use crate::state::{
    AuthOutcome, FailureReason, FamilyId, MfaMethod, RotateOutcome, UserId, VerificationKind,
    VerificationOutcome,
};
use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// The session subsystem's public surface.
pub struct SessionFacade<U, RS, CS, BS, TS, DS, N, C, A> {
    directory: U,
    rotation: TokenRotationEngine<RS, C, A>,
    orchestrator: ChallengeOrchestrator<U, CS, BS, TS, DS, N, C, A>,
    clock: C,
    audit: A,
}

impl<U, RS, CS, BS, TS, DS, N, C, A> SessionFacade<U, RS, CS, BS, TS, DS, N, C, A>
where
    U: UserDirectory,
    RS: RefreshTokenStore,
    CS: ChallengeStore,
    BS: BackupCodeStore,
    TS: AttemptStore,
    DS: TrustedDeviceStore,
    N: Notifier,
    C: Clock,
    A: AuditSink,
{
    /// Compose the facade from its two engines.
    pub const fn new(
        directory: U,
        rotation: TokenRotationEngine<RS, C, A>,
        orchestrator: ChallengeOrchestrator<U, CS, BS, TS, DS, N, C, A>,
        clock: C,
        audit: A,
    ) -> Self {
        Self { directory, rotation, orchestrator, clock, audit }
    }

    /// Authenticate with a password, possibly escalating to MFA.
    ///
    /// `device_token` is the trusted-device credential, if the client holds
    /// one; a valid token skips the challenge step entirely.
    ///
    /// # Errors
    ///
    /// Returns error if a collaborator fails; never for bad credentials.
    pub async fn login(
        &self,
        username_or_email: &str,
        password: &str,
        client_ip: IpAddr,
        user_agent: &str,
        device_token: Option<&str>,
    ) -> Result<AuthOutcome> {
        let now = self.clock.now();

        let Some(user) = self.directory.find_by_login(username_or_email).await? else {
            // Burn a verification anyway so unknown-user and wrong-password
            // paths do comparable work.
            let _ = self.directory.verify_password(UserId::new(), password).await;
            self.log_login(None, client_ip, now, false, "invalid_credentials").await;
            return Ok(AuthOutcome::Failed(FailureReason::InvalidCredentials));
        };

        if !user.is_active {
            self.log_login(Some(user.user_id), client_ip, now, false, "account_inactive").await;
            return Ok(AuthOutcome::Failed(FailureReason::AccountInactive));
        }

        if self
            .orchestrator
            .attempts()
            .is_locked_out(user.user_id, VerificationKind::Password)
            .await?
        {
            self.log_login(Some(user.user_id), client_ip, now, false, "locked_out").await;
            return Ok(AuthOutcome::Failed(FailureReason::TooManyAttempts));
        }

        if !self.directory.verify_password(user.user_id, password).await? {
            self.orchestrator
                .attempts()
                .record_failed_attempt(user.user_id, VerificationKind::Password)
                .await?;
            self.log_login(Some(user.user_id), client_ip, now, false, "invalid_credentials").await;
            return Ok(AuthOutcome::Failed(FailureReason::InvalidCredentials));
        }

        self.orchestrator
            .attempts()
            .reset_attempts(user.user_id, VerificationKind::Password)
            .await?;

        if !self.orchestrator.is_mfa_required(&user) {
            let tokens = self.rotation.issue_initial_pair(user.user_id, client_ip).await?;
            self.log_login(Some(user.user_id), client_ip, now, true, "password").await;
            return Ok(AuthOutcome::Success {
                tokens,
                trusted_device_token: None,
                requires_password_change: user.requires_password_change,
            });
        }

        if let Some(token) = device_token {
            if self
                .orchestrator
                .try_bypass_trusted_device(&user, token, user_agent, client_ip)
                .await?
            {
                let tokens = self.rotation.issue_initial_pair(user.user_id, client_ip).await?;
                self.log_login(Some(user.user_id), client_ip, now, true, "trusted_device").await;
                return Ok(AuthOutcome::Success {
                    tokens,
                    trusted_device_token: None,
                    requires_password_change: user.requires_password_change,
                });
            }
        }

        let challenge = self.orchestrator.issue_challenge(&user, client_ip).await?;
        self.log_login(Some(user.user_id), client_ip, now, true, "mfa_required").await;
        Ok(AuthOutcome::MfaRequired(challenge))
    }

    /// Exchange a refresh token for a fresh session pair.
    ///
    /// # Errors
    ///
    /// Returns error if a collaborator fails; token problems are outcomes.
    pub async fn refresh_session(
        &self,
        refresh_token: &str,
        client_ip: IpAddr,
    ) -> Result<AuthOutcome> {
        match self.rotation.rotate(refresh_token, client_ip).await? {
            RotateOutcome::Rotated(tokens) => {
                // The directory may have deactivated the account since the
                // last refresh; a rotated family for a dead account is
                // closed on the spot.
                match self.directory.find_by_id(tokens.user_id).await? {
                    Some(user) if user.is_active => Ok(AuthOutcome::Success {
                        trusted_device_token: None,
                        requires_password_change: user.requires_password_change,
                        tokens,
                    }),
                    _ => {
                        self.rotation.revoke_family(tokens.family_id).await?;
                        Ok(AuthOutcome::Failed(FailureReason::AccountInactive))
                    }
                }
            }
            RotateOutcome::ReuseDetected => Ok(AuthOutcome::Failed(FailureReason::ReuseDetected)),
            RotateOutcome::InvalidOrExpired => {
                Ok(AuthOutcome::Failed(FailureReason::InvalidOrExpiredToken))
            }
            RotateOutcome::SessionExpired => Ok(AuthOutcome::Failed(FailureReason::SessionExpired)),
        }
    }

    /// Verify a second factor against an open challenge.
    ///
    /// With `trust_device` set, a successful verification also enrolls the
    /// calling device and returns its bypass token.
    ///
    /// # Errors
    ///
    /// Returns error if a collaborator fails; verification problems are
    /// outcomes.
    pub async fn verify_challenge(
        &self,
        challenge_token: &str,
        method: MfaMethod,
        credential: &str,
        trust_device: bool,
        client_ip: IpAddr,
        user_agent: &str,
    ) -> Result<AuthOutcome> {
        let outcome = match method {
            MfaMethod::EmailCode => {
                self.orchestrator
                    .verify_email_code(challenge_token, credential, client_ip)
                    .await?
            }
            MfaMethod::Totp => {
                self.orchestrator.verify_totp(challenge_token, credential, client_ip).await?
            }
            MfaMethod::BackupCode => {
                self.orchestrator
                    .verify_backup_code(challenge_token, credential, client_ip)
                    .await?
            }
        };

        match outcome {
            VerificationOutcome::Verified { user_id } => {
                let now = self.clock.now();
                let user = match self.directory.find_by_id(user_id).await? {
                    Some(user) if user.is_active => user,
                    _ => {
                        self.log_login(Some(user_id), client_ip, now, false, "account_inactive")
                            .await;
                        return Ok(AuthOutcome::Failed(FailureReason::AccountInactive));
                    }
                };

                let tokens = self.rotation.issue_initial_pair(user_id, client_ip).await?;
                let trusted_device_token = if trust_device {
                    Some(
                        self.orchestrator
                            .devices()
                            .create_trusted_device(user_id, user_agent, client_ip)
                            .await?,
                    )
                } else {
                    None
                };

                self.log_login(Some(user_id), client_ip, now, true, "mfa").await;
                Ok(AuthOutcome::Success {
                    tokens,
                    trusted_device_token,
                    requires_password_change: user.requires_password_change,
                })
            }
            VerificationOutcome::InvalidCode => Ok(AuthOutcome::Failed(FailureReason::InvalidCode)),
            VerificationOutcome::TooManyAttempts => {
                Ok(AuthOutcome::Failed(FailureReason::TooManyAttempts))
            }
            VerificationOutcome::InvalidOrExpired => {
                Ok(AuthOutcome::Failed(FailureReason::InvalidOrExpiredToken))
            }
        }
    }

    /// Revoke a whole session family (logout, admin action). Idempotent.
    ///
    /// # Errors
    ///
    /// Returns error if the token store fails.
    pub async fn revoke_session(&self, family_id: FamilyId) -> Result<u64> {
        self.rotation.revoke_family(family_id).await
    }

    async fn log_login(
        &self,
        user_id: Option<UserId>,
        client_ip: IpAddr,
        now: DateTime<Utc>,
        success: bool,
        detail: &str,
    ) {
        self.audit
            .log_security_event(SecurityEvent {
                kind: SecurityEventKind::Login,
                user_id,
                client_ip: Some(client_ip),
                success,
                detail: Some(detail.to_string()),
                at: now,
            })
            .await;
    }
}
