//! # Keystone Auth
//!
//! Session- and identity-security core for a web backend: refresh-token
//! rotation with reuse detection, MFA challenge orchestration (email code,
//! TOTP, backup code), brute-force lockout, and trusted-device bypass.
//!
//! ## Architecture
//!
//! Each component is a plain struct holding only its injected collaborators
//! (directory, clock, stores, notifier, audit sink) with behavior as async
//! methods — no global state. External dependencies are traits in
//! [`providers`]; in-memory implementations for testing live in [`mocks`].
//!
//! Shared mutable state exists only behind the store traits, and every
//! race-prone mutation is a single conditional store operation
//! (rotate-if-active, consume-if-unconsumed, burn-if-unused). The engines
//! never read-then-write.
//!
//! ## Flows
//!
//! ```text
//! login ── password ok ──┬─ no MFA / trusted device ──────► tokens
//!                        └─ challenge issued ─ verify ok ─► tokens
//! refresh ── rotate-if-active ─┬─ rotated ────────────────► tokens
//!                              └─ replayed ── family revoked
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use keystone_auth::{AuthOutcome, SessionFacade};
//!
//! let outcome = facade
//!     .login("ada@example.com", "correct horse", client_ip, user_agent, None)
//!     .await?;
//! match outcome {
//!     AuthOutcome::Success { tokens, .. } => { /* set cookies */ }
//!     AuthOutcome::MfaRequired(challenge) => { /* prompt for code */ }
//!     AuthOutcome::Failed(reason) => { /* uniform error page */ }
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod access_token;
pub mod attempts;
pub mod challenge;
pub mod config;
pub mod crypto;
pub mod devices;
pub mod error;
pub mod mocks;
pub mod providers;
pub mod rotation;
pub mod session;
pub mod state;
pub mod totp;

// Re-export main types for convenience
pub use access_token::{AccessClaims, AccessTokenSigner};
pub use attempts::AttemptTracker;
pub use challenge::ChallengeOrchestrator;
pub use config::AuthConfig;
pub use devices::TrustedDeviceRegistry;
pub use error::{AuthError, Result};
pub use rotation::TokenRotationEngine;
pub use session::SessionFacade;
pub use state::{
    AuthOutcome, ChallengeIssued, FailureReason, FamilyId, IssuedTokens, MfaMethod,
    RotateOutcome, UserId, VerificationKind, VerificationOutcome,
};
