//! External collaborators of the session core.
//!
//! This module defines traits for everything the session and MFA engines
//! depend on: the user directory, the clock, the code notifier, the audit
//! sink, and the five backing stores. The engines depend on these traits;
//! the embedding application provides concrete implementations.
//!
//! Store traits expose **conditional-update** operations (`rotate_active`,
//! `consume`, `consume_code`, `record_failure`) rather than read/write
//! primitives, so every race is resolved by the store's atomicity guarantee
//! instead of by engine-level locking:
//!
//! - **Testing**: in-memory mocks (see [`crate::mocks`]) resolve them under
//!   one mutex.
//! - **Production**: a SQL store resolves them with
//!   `UPDATE ... WHERE revoked_at IS NULL` and an affected-row check; a
//!   TTL key-value store with an atomic get-and-delete.

pub mod attempt_store;
pub mod audit;
pub mod backup_codes;
pub mod challenge_store;
pub mod clock;
pub mod device_store;
pub mod notifier;
pub mod token_store;
pub mod user;

// Re-export provider traits and their auxiliary types
pub use attempt_store::{AttemptState, AttemptStore};
pub use audit::{AuditSink, SecurityEvent, SecurityEventKind, TracingAuditSink};
pub use backup_codes::BackupCodeStore;
pub use challenge_store::ChallengeStore;
pub use clock::{Clock, SystemClock};
pub use device_store::TrustedDeviceStore;
pub use notifier::Notifier;
pub use token_store::{RefreshTokenStore, RotationUpdate};
pub use user::{User, UserDirectory};
