//! Refresh-token rotation with reuse detection.
//!
//! Every login opens a *family* of refresh tokens; each refresh revokes the
//! presented token and issues its successor inside one conditional store
//! update. A token that comes back after it was rotated away can only be a
//! replay — the thief or the victim still holds the old value — so the
//! whole family is revoked on the spot.
//!
//! Two lifetimes bound a session: the short per-link expiry (freshness)
//! and the absolute ceiling measured from `session_started_at`, which no
//! amount of rotation can extend.

use crate::access_token::AccessTokenSigner;
use crate::config::AuthConfig;
use crate::crypto;
use crate::error::Result;
use crate::providers::{AuditSink, Clock, RefreshTokenStore, RotationUpdate, SecurityEvent, SecurityEventKind};
use crate::state::{FamilyId, IssuedTokens, RefreshTokenRecord, RotateOutcome, UserId};
use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// Issues, rotates, and revokes refresh-token families.
#[derive(Clone)]
pub struct TokenRotationEngine<S, C, A> {
    store: S,
    clock: C,
    audit: A,
    signer: AccessTokenSigner,
    config: AuthConfig,
}

impl<S, C, A> TokenRotationEngine<S, C, A>
where
    S: RefreshTokenStore,
    C: Clock,
    A: AuditSink,
{
    /// Create an engine over the given store, clock, audit sink, and
    /// access-token signer.
    pub const fn new(
        store: S,
        clock: C,
        audit: A,
        signer: AccessTokenSigner,
        config: AuthConfig,
    ) -> Self {
        Self { store, clock, audit, signer, config }
    }

    /// Open a new family for `user_id` and return its first token pair.
    ///
    /// # Errors
    ///
    /// Returns error if the token store or the signer fails.
    pub async fn issue_initial_pair(
        &self,
        user_id: UserId,
        client_ip: IpAddr,
    ) -> Result<IssuedTokens> {
        let now = self.clock.now();
        let family_id = FamilyId::new();
        let refresh_token = crypto::generate_opaque_token();

        self.store
            .insert(RefreshTokenRecord {
                id: uuid::Uuid::new_v4(),
                token_hash: crypto::hash_secret(&refresh_token),
                family_id,
                user_id,
                issued_at: now,
                expires_at: now + self.config.refresh_token_ttl,
                session_started_at: now,
                revoked_at: None,
                created_by_ip: client_ip,
            })
            .await?;

        let (access_token, access_expires_at) = self.signer.sign(user_id, family_id, now)?;

        tracing::info!(user_id = %user_id.0, family_id = %family_id.0, "session family opened");

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            family_id,
            user_id,
            session_started_at: now,
            access_expires_at,
        })
    }

    /// Exchange a refresh token for a fresh pair.
    ///
    /// Exactly one of any number of concurrent calls presenting the same
    /// token can observe [`RotateOutcome::Rotated`]; the rest observe
    /// [`RotateOutcome::ReuseDetected`] after the family has been revoked.
    ///
    /// # Errors
    ///
    /// Returns error if the token store or the signer fails.
    pub async fn rotate(&self, presented: &str, client_ip: IpAddr) -> Result<RotateOutcome> {
        let now = self.clock.now();
        let token_hash = crypto::hash_secret(presented);

        let Some(record) = self.store.find_by_hash(&token_hash).await? else {
            return Ok(RotateOutcome::InvalidOrExpired);
        };

        if record.is_revoked() {
            return self.punish_reuse(&record, client_ip, now).await;
        }

        if record.is_expired(now) {
            return Ok(RotateOutcome::InvalidOrExpired);
        }

        if now > record.session_started_at + self.config.session_ceiling {
            self.log_refresh(&record, client_ip, now, false, "session_ceiling").await;
            return Ok(RotateOutcome::SessionExpired);
        }

        let refresh_token = crypto::generate_opaque_token();
        let successor = RefreshTokenRecord {
            id: uuid::Uuid::new_v4(),
            token_hash: crypto::hash_secret(&refresh_token),
            family_id: record.family_id,
            user_id: record.user_id,
            issued_at: now,
            expires_at: now + self.config.refresh_token_ttl,
            // The ceiling is anchored at family creation; rotation never
            // moves it.
            session_started_at: record.session_started_at,
            revoked_at: None,
            created_by_ip: client_ip,
        };

        match self.store.rotate_active(&token_hash, successor, now).await? {
            RotationUpdate::Rotated => {
                let (access_token, access_expires_at) =
                    self.signer.sign(record.user_id, record.family_id, now)?;
                self.log_refresh(&record, client_ip, now, true, "rotated").await;

                Ok(RotateOutcome::Rotated(IssuedTokens {
                    access_token,
                    refresh_token,
                    family_id: record.family_id,
                    user_id: record.user_id,
                    session_started_at: record.session_started_at,
                    access_expires_at,
                }))
            }
            // Lost the race against a concurrent rotation of the same
            // token: by definition the token has now been used twice.
            RotationUpdate::AlreadyConsumed => self.punish_reuse(&record, client_ip, now).await,
            RotationUpdate::NotFound => Ok(RotateOutcome::InvalidOrExpired),
        }
    }

    /// Revoke every token in a family (logout, admin action). Idempotent.
    ///
    /// Returns the number of records newly revoked.
    ///
    /// # Errors
    ///
    /// Returns error if the token store fails.
    pub async fn revoke_family(&self, family_id: FamilyId) -> Result<u64> {
        let now = self.clock.now();
        let revoked = self.store.revoke_family(family_id, now).await?;

        self.audit
            .log_security_event(SecurityEvent {
                kind: SecurityEventKind::FamilyRevoked,
                user_id: None,
                client_ip: None,
                success: true,
                detail: Some(format!("revoked {revoked} tokens")),
                at: now,
            })
            .await;

        Ok(revoked)
    }

    async fn punish_reuse(
        &self,
        record: &RefreshTokenRecord,
        client_ip: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<RotateOutcome> {
        let revoked = self.store.revoke_family(record.family_id, now).await?;

        tracing::warn!(
            user_id = %record.user_id.0,
            family_id = %record.family_id.0,
            revoked,
            "refresh-token reuse detected; family revoked"
        );
        self.audit
            .log_security_event(SecurityEvent {
                kind: SecurityEventKind::TokenReuseDetected,
                user_id: Some(record.user_id),
                client_ip: Some(client_ip),
                success: false,
                detail: Some(format!("family revoked ({revoked} tokens)")),
                at: now,
            })
            .await;

        Ok(RotateOutcome::ReuseDetected)
    }

    async fn log_refresh(
        &self,
        record: &RefreshTokenRecord,
        client_ip: IpAddr,
        now: DateTime<Utc>,
        success: bool,
        detail: &str,
    ) {
        self.audit
            .log_security_event(SecurityEvent {
                kind: SecurityEventKind::SessionRefresh,
                user_id: Some(record.user_id),
                client_ip: Some(client_ip),
                success,
                detail: Some(detail.to_string()),
                at: now,
            })
            .await;
    }
}
