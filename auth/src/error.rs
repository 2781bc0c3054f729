//! Error types for session and MFA operations.
//!
//! Domain-level failures (wrong password, expired challenge, detected token
//! reuse) are **not** errors — they travel as outcome enums so callers are
//! forced to handle every branch. `AuthError` covers only infrastructure
//! failures that no caller can meaningfully branch on.

use thiserror::Error;

/// Result type alias for session and MFA operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Infrastructure failures surfaced by the session core.
///
/// Everything here crosses the public boundary as a generic failure; the
/// variants exist for logging and retry policy at the persistence edge,
/// never for user-visible responses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// A backing store (token, challenge, backup-code, device, or attempt
    /// store) failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Access-token signing or validation failed at the crypto layer.
    #[error("access token error: {0}")]
    AccessToken(String),

    /// Internal invariant violation (should not be exposed to users).
    #[error("internal error")]
    Internal,
}

impl AuthError {
    /// Returns `true` if the operation may succeed when retried, i.e. the
    /// failure came from a backing store rather than from bad input or a
    /// broken invariant.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_retryable() {
        assert!(AuthError::Storage("timeout".to_string()).is_retryable());
        assert!(!AuthError::Internal.is_retryable());
        assert!(!AuthError::AccessToken("bad key".to_string()).is_retryable());
    }
}
