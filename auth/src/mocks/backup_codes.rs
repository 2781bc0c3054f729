//! Mock backup-code store for testing.

use crate::error::Result;
use crate::providers::BackupCodeStore;
use crate::state::{BackupCode, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory backup-code store.
#[derive(Debug, Clone)]
pub struct MockBackupCodeStore {
    codes: Arc<Mutex<HashMap<UserId, Vec<BackupCode>>>>,
}

impl MockBackupCodeStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            codes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Seed a user with unused codes, given their hashes.
    ///
    /// Batch generation is out of scope for the core, so tests seed hashes
    /// directly.
    pub fn seed(&self, user_id: UserId, code_hashes: impl IntoIterator<Item = String>) {
        let mut codes = self.codes.lock().unwrap();
        let entry = codes.entry(user_id).or_default();
        for code_hash in code_hashes {
            entry.push(BackupCode { user_id, code_hash, used_at: None });
        }
    }

    /// All codes for a user, used or not (for assertions).
    #[must_use]
    pub fn get_all(&self, user_id: UserId) -> Vec<BackupCode> {
        self.codes.lock().unwrap().get(&user_id).cloned().unwrap_or_default()
    }
}

impl Default for MockBackupCodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupCodeStore for MockBackupCodeStore {
    async fn find_unused(&self, user_id: UserId) -> Result<Vec<BackupCode>> {
        let codes = self.codes.lock().unwrap();
        Ok(codes
            .get(&user_id)
            .map(|list| list.iter().filter(|c| c.is_unused()).cloned().collect())
            .unwrap_or_default())
    }

    async fn consume_code(
        &self,
        user_id: UserId,
        code_hash: &str,
        used_at: DateTime<Utc>,
    ) -> Result<bool> {
        // Flip unused→used under one guard; second caller sees used.
        let mut codes = self.codes.lock().unwrap();
        let Some(list) = codes.get_mut(&user_id) else {
            return Ok(false);
        };
        for code in list.iter_mut() {
            if code.code_hash == code_hash && code.is_unused() {
                code.used_at = Some(used_at);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn has_unused(&self, user_id: UserId) -> Result<bool> {
        let codes = self.codes.lock().unwrap();
        Ok(codes
            .get(&user_id)
            .is_some_and(|list| list.iter().any(|c| c.is_unused())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn consume_flips_exactly_once() {
        let store = MockBackupCodeStore::new();
        let user = UserId::new();
        store.seed(user, ["hash-1".to_string()]);

        assert!(store.consume_code(user, "hash-1", Utc::now()).await.unwrap());
        assert!(!store.consume_code(user, "hash-1", Utc::now()).await.unwrap());
        assert!(!store.has_unused(user).await.unwrap());
    }

    #[tokio::test]
    async fn find_unused_filters_spent_codes() {
        let store = MockBackupCodeStore::new();
        let user = UserId::new();
        store.seed(user, ["a".to_string(), "b".to_string()]);
        store.consume_code(user, "a", Utc::now()).await.unwrap();

        let unused = store.find_unused(user).await.unwrap();
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].code_hash, "b");
    }
}
