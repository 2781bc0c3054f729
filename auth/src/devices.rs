//! Trusted-device registry.
//!
//! A device that completed MFA once can be enrolled for bypass: the client
//! keeps an opaque token, the store keeps its hash plus a fingerprint of
//! the user agent and network prefix. Bypass requires hash AND fingerprint
//! to match while unexpired — a stolen token replayed from a different
//! device profile fails closed.

use crate::config::AuthConfig;
use crate::crypto;
use crate::error::Result;
use crate::providers::{AuditSink, Clock, SecurityEvent, SecurityEventKind, TrustedDeviceStore};
use crate::state::{TrustedDevice, UserId};
use std::net::IpAddr;

/// Issues and validates trusted-device bypass tokens.
#[derive(Debug, Clone)]
pub struct TrustedDeviceRegistry<S, C, A> {
    store: S,
    clock: C,
    audit: A,
    config: AuthConfig,
}

impl<S, C, A> TrustedDeviceRegistry<S, C, A>
where
    S: TrustedDeviceStore,
    C: Clock,
    A: AuditSink,
{
    /// Create a registry over the given store, clock, and audit sink.
    pub const fn new(store: S, clock: C, audit: A, config: AuthConfig) -> Self {
        Self { store, clock, audit, config }
    }

    /// Enroll the calling device and return the opaque token the client
    /// should present on future logins.
    ///
    /// # Errors
    ///
    /// Returns error if the device store fails.
    pub async fn create_trusted_device(
        &self,
        user_id: UserId,
        user_agent: &str,
        client_ip: IpAddr,
    ) -> Result<String> {
        let now = self.clock.now();
        let token = crypto::generate_opaque_token();

        self.store
            .insert(TrustedDevice {
                user_id,
                token_hash: crypto::hash_secret(&token),
                fingerprint: crypto::device_fingerprint(user_agent, client_ip),
                created_at: now,
                expires_at: now + self.config.trusted_device_ttl,
                last_used_at: now,
            })
            .await?;

        self.audit
            .log_security_event(SecurityEvent {
                kind: SecurityEventKind::TrustedDeviceEnrolled,
                user_id: Some(user_id),
                client_ip: Some(client_ip),
                success: true,
                detail: None,
                at: now,
            })
            .await;

        Ok(token)
    }

    /// Check a presented device token against the caller's current device
    /// profile. Touches `last_used_at` on success.
    ///
    /// # Errors
    ///
    /// Returns error if the device store fails.
    pub async fn validate(
        &self,
        user_id: UserId,
        device_token: &str,
        user_agent: &str,
        client_ip: IpAddr,
    ) -> Result<bool> {
        let now = self.clock.now();
        let token_hash = crypto::hash_secret(device_token);

        let accepted = match self.store.find(user_id, &token_hash).await? {
            Some(device) => {
                let fingerprint = crypto::device_fingerprint(user_agent, client_ip);
                let fingerprint_matches = constant_time_eq::constant_time_eq(
                    device.fingerprint.as_bytes(),
                    fingerprint.as_bytes(),
                );
                fingerprint_matches && now <= device.expires_at
            }
            None => false,
        };

        if accepted {
            self.store.touch(user_id, &token_hash, now).await?;
        } else {
            tracing::warn!(user_id = %user_id.0, "trusted-device bypass rejected");
        }

        self.audit
            .log_security_event(SecurityEvent {
                kind: SecurityEventKind::TrustedDeviceBypass,
                user_id: Some(user_id),
                client_ip: Some(client_ip),
                success: accepted,
                detail: None,
                at: now,
            })
            .await;

        Ok(accepted)
    }

    /// Drop one enrolled device.
    ///
    /// # Errors
    ///
    /// Returns error if the device store fails.
    pub async fn revoke(&self, user_id: UserId, device_token: &str) -> Result<bool> {
        self.store
            .revoke(user_id, &crypto::hash_secret(device_token))
            .await
    }

    /// Drop every enrolled device for a user.
    ///
    /// # Errors
    ///
    /// Returns error if the device store fails.
    pub async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64> {
        self.store.revoke_all_for_user(user_id).await
    }
}
