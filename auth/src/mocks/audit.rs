//! Mock audit sink for testing.

use crate::providers::{AuditSink, SecurityEvent, SecurityEventKind};
use std::sync::{Arc, Mutex};

/// In-memory audit sink that records every event.
#[derive(Debug, Clone)]
pub struct MockAuditSink {
    events: Arc<Mutex<Vec<SecurityEvent>>>,
}

impl MockAuditSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every event recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events of one kind.
    #[must_use]
    pub fn events_of_kind(&self, kind: SecurityEventKind) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }
}

impl Default for MockAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MockAuditSink {
    async fn log_security_event(&self, event: SecurityEvent) {
        self.events.lock().unwrap().push(event);
    }
}
