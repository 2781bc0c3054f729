//! Mock notifier for testing.

use crate::error::{AuthError, Result};
use crate::providers::Notifier;
use std::sync::{Arc, Mutex};

/// One recorded dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCode {
    /// Delivery address.
    pub email: String,

    /// The code in clear.
    pub code: String,

    /// Advertised validity in minutes.
    pub expires_in_minutes: i64,
}

/// In-memory notifier that records every dispatched code.
///
/// Tests read the "delivered" code back instead of scraping an inbox, and
/// can make dispatch fail to prove issuance survives a dead relay.
#[derive(Debug, Clone)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<SentCode>>>,
    failing: Arc<Mutex<bool>>,
}

impl MockNotifier {
    /// Create a notifier that delivers successfully.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(Mutex::new(false)),
        }
    }

    /// Everything dispatched so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentCode> {
        self.sent.lock().unwrap().clone()
    }

    /// The most recently dispatched code, if any.
    #[must_use]
    pub fn last_code(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|s| s.code.clone())
    }

    /// Make every subsequent dispatch fail.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for MockNotifier {
    async fn send_mfa_code(&self, email: &str, code: &str, expires_in_minutes: i64) -> Result<()> {
        if *self.failing.lock().unwrap() {
            return Err(AuthError::Storage("notifier down".to_string()));
        }
        self.sent.lock().unwrap().push(SentCode {
            email: email.to_string(),
            code: code.to_string(),
            expires_in_minutes,
        });
        Ok(())
    }
}
