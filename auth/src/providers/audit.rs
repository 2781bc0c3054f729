//! Security audit sink.
//!
//! Every login, refresh, reuse detection, lockout, and trusted-device event
//! is reported here. Storage and retention of the trail are external; the
//! default sink emits structured `tracing` events.

use crate::state::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityEventKind {
    /// Password authentication completed (either way).
    Login,

    /// A refresh token was presented for rotation.
    SessionRefresh,

    /// An already-rotated token was replayed; its family was revoked.
    TokenReuseDetected,

    /// A session family was revoked (logout, admin, or reuse response).
    FamilyRevoked,

    /// An MFA challenge was issued.
    ChallengeIssued,

    /// A second factor was verified (either way).
    ChallengeVerified,

    /// A verification path crossed the failure threshold and locked.
    LockoutTriggered,

    /// A device was enrolled for MFA bypass.
    TrustedDeviceEnrolled,

    /// A trusted device was presented for bypass (either way).
    TrustedDeviceBypass,
}

impl SecurityEventKind {
    /// Stable string form for log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::SessionRefresh => "session_refresh",
            Self::TokenReuseDetected => "token_reuse_detected",
            Self::FamilyRevoked => "family_revoked",
            Self::ChallengeIssued => "challenge_issued",
            Self::ChallengeVerified => "challenge_verified",
            Self::LockoutTriggered => "lockout_triggered",
            Self::TrustedDeviceEnrolled => "trusted_device_enrolled",
            Self::TrustedDeviceBypass => "trusted_device_bypass",
        }
    }
}

/// One security-relevant occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// Event kind.
    pub kind: SecurityEventKind,

    /// Affected user, when one was resolved.
    pub user_id: Option<UserId>,

    /// Client address, when the flow had one.
    pub client_ip: Option<IpAddr>,

    /// Whether the attempted action succeeded.
    pub success: bool,

    /// Free-form detail (failure reason, method name). Never secrets.
    pub detail: Option<String>,

    /// Event time.
    pub at: DateTime<Utc>,
}

/// Audit sink.
///
/// Fire-and-forget: the sink must not fail the calling flow. Sinks that
/// buffer or ship events own their error handling.
pub trait AuditSink: Send + Sync {
    /// Record one security event.
    fn log_security_event(
        &self,
        event: SecurityEvent,
    ) -> impl std::future::Future<Output = ()> + Send;
}

/// Default sink: structured `tracing` events, `warn!` for failures and
/// attack signals, `info!` for the rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    async fn log_security_event(&self, event: SecurityEvent) {
        let user_id = event.user_id.map(|u| u.0.to_string());
        let client_ip = event.client_ip.map(|ip| ip.to_string());

        let alarming = matches!(
            event.kind,
            SecurityEventKind::TokenReuseDetected | SecurityEventKind::LockoutTriggered
        );
        if alarming || !event.success {
            tracing::warn!(
                target: "keystone_audit",
                kind = event.kind.as_str(),
                user_id,
                client_ip,
                success = event.success,
                detail = event.detail.as_deref(),
                "security event"
            );
        } else {
            tracing::info!(
                target: "keystone_audit",
                kind = event.kind.as_str(),
                user_id,
                client_ip,
                success = event.success,
                detail = event.detail.as_deref(),
                "security event"
            );
        }
    }
}
