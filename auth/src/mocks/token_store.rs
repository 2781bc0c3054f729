//! Mock refresh-token store for testing.

use crate::error::Result;
use crate::providers::{RefreshTokenStore, RotationUpdate};
use crate::state::{FamilyId, RefreshTokenRecord};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory refresh-token store keyed by token hash.
///
/// The rotation swap runs under one mutex guard, giving the same
/// exactly-one-winner guarantee a SQL implementation gets from a
/// conditional `UPDATE` plus row count.
#[derive(Debug, Clone)]
pub struct MockRefreshTokenStore {
    records: Arc<Mutex<HashMap<String, RefreshTokenRecord>>>,
}

impl MockRefreshTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// All stored records (for assertions).
    #[must_use]
    pub fn get_all(&self) -> Vec<RefreshTokenRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    /// All records of one family (for assertions).
    #[must_use]
    pub fn family(&self, family_id: FamilyId) -> Vec<RefreshTokenRecord> {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.family_id == family_id)
            .cloned()
            .collect()
    }
}

impl Default for MockRefreshTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshTokenStore for MockRefreshTokenStore {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        records.insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.get(token_hash).cloned())
    }

    async fn rotate_active(
        &self,
        old_hash: &str,
        successor: RefreshTokenRecord,
        revoked_at: DateTime<Utc>,
    ) -> Result<RotationUpdate> {
        // Check-revoke-insert under one guard; both sides of the swap are
        // visible together or not at all.
        let mut records = self.records.lock().unwrap();

        let Some(old) = records.get_mut(old_hash) else {
            return Ok(RotationUpdate::NotFound);
        };
        if old.revoked_at.is_some() {
            return Ok(RotationUpdate::AlreadyConsumed);
        }

        old.revoked_at = Some(revoked_at);
        records.insert(successor.token_hash.clone(), successor);
        Ok(RotationUpdate::Rotated)
    }

    async fn revoke_family(&self, family_id: FamilyId, revoked_at: DateTime<Utc>) -> Result<u64> {
        let mut records = self.records.lock().unwrap();
        let mut revoked = 0;
        for record in records.values_mut() {
            if record.family_id == family_id && record.revoked_at.is_none() {
                record.revoked_at = Some(revoked_at);
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::UserId;

    fn record(hash: &str, family_id: FamilyId) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            id: uuid::Uuid::new_v4(),
            token_hash: hash.to_string(),
            family_id,
            user_id: UserId::new(),
            issued_at: now,
            expires_at: now + chrono::Duration::days(7),
            session_started_at: now,
            revoked_at: None,
            created_by_ip: "127.0.0.1".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn rotate_active_is_single_winner() {
        let store = MockRefreshTokenStore::new();
        let family = FamilyId::new();
        store.insert(record("old", family)).await.unwrap();

        let now = Utc::now();
        let first = store
            .rotate_active("old", record("next-a", family), now)
            .await
            .unwrap();
        let second = store
            .rotate_active("old", record("next-b", family), now)
            .await
            .unwrap();

        assert_eq!(first, RotationUpdate::Rotated);
        assert_eq!(second, RotationUpdate::AlreadyConsumed);
    }

    #[tokio::test]
    async fn rotate_missing_token_reports_not_found() {
        let store = MockRefreshTokenStore::new();
        let update = store
            .rotate_active("missing", record("next", FamilyId::new()), Utc::now())
            .await
            .unwrap();
        assert_eq!(update, RotationUpdate::NotFound);
    }

    #[tokio::test]
    async fn revoke_family_counts_only_new_revocations() {
        let store = MockRefreshTokenStore::new();
        let family = FamilyId::new();
        store.insert(record("a", family)).await.unwrap();
        store.insert(record("b", family)).await.unwrap();
        store.insert(record("other", FamilyId::new())).await.unwrap();

        assert_eq!(store.revoke_family(family, Utc::now()).await.unwrap(), 2);
        assert_eq!(store.revoke_family(family, Utc::now()).await.unwrap(), 0);

        // Unrelated families are untouched.
        let other = store.get_all().into_iter().find(|r| r.token_hash == "other").unwrap();
        assert!(other.revoked_at.is_none());
    }
}
