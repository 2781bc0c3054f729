//! Code-delivery notifier trait.
//!
//! Delivery transport (SMTP, SMS gateway, queue) is external. Dispatch is
//! fire-and-forget from the challenge orchestrator's point of view: a
//! delivery failure is logged and the challenge stands, because failing the
//! whole login over a flaky mail relay would be a denial of service.

use crate::error::Result;

/// Outbound delivery of one-time MFA codes.
pub trait Notifier: Send + Sync {
    /// Send a one-time code to the user's email address.
    ///
    /// # Arguments
    ///
    /// * `email` - Delivery address
    /// * `code` - The short numeric code, in clear (delivery is the only
    ///   place it exists unhashed)
    /// * `expires_in_minutes` - How long the code stays valid, for the
    ///   message template
    ///
    /// # Errors
    ///
    /// Returns error if dispatch fails. Callers log and continue.
    fn send_mfa_code(
        &self,
        email: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
