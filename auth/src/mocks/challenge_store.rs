//! Mock MFA challenge store for testing.

use crate::error::Result;
use crate::providers::ChallengeStore;
use crate::state::MfaChallenge;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory challenge store keyed by challenge-token hash.
#[derive(Debug, Clone)]
pub struct MockChallengeStore {
    challenges: Arc<Mutex<HashMap<String, MfaChallenge>>>,
}

impl MockChallengeStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            challenges: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// All stored challenges (for assertions).
    #[must_use]
    pub fn get_all(&self) -> Vec<MfaChallenge> {
        self.challenges.lock().unwrap().values().cloned().collect()
    }
}

impl Default for MockChallengeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengeStore for MockChallengeStore {
    async fn put(&self, token_hash: &str, challenge: MfaChallenge) -> Result<()> {
        let mut challenges = self.challenges.lock().unwrap();
        challenges.insert(token_hash.to_string(), challenge);
        Ok(())
    }

    async fn get(&self, token_hash: &str) -> Result<Option<MfaChallenge>> {
        let challenges = self.challenges.lock().unwrap();
        Ok(challenges.get(token_hash).cloned())
    }

    async fn consume(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<MfaChallenge>> {
        // Check-and-mark under one guard: exactly one caller may consume.
        let mut challenges = self.challenges.lock().unwrap();
        match challenges.get_mut(token_hash) {
            Some(challenge) if !challenge.consumed && !challenge.is_expired(now) => {
                challenge.consumed = true;
                Ok(Some(challenge.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MfaMethod, UserId};
    use chrono::Duration;

    fn challenge(expires_at: DateTime<Utc>) -> MfaChallenge {
        MfaChallenge {
            user_id: UserId::new(),
            method: MfaMethod::EmailCode,
            email_code_hash: Some("hash".to_string()),
            created_at: Utc::now(),
            expires_at,
            consumed: false,
        }
    }

    #[tokio::test]
    async fn consume_is_single_use() {
        let store = MockChallengeStore::new();
        let now = Utc::now();
        store.put("key", challenge(now + Duration::minutes(5))).await.unwrap();

        assert!(store.consume("key", now).await.unwrap().is_some());
        assert!(store.consume("key", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_challenge_cannot_be_consumed() {
        let store = MockChallengeStore::new();
        let now = Utc::now();
        store.put("key", challenge(now - Duration::seconds(1))).await.unwrap();

        assert!(store.consume("key", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_consume_has_one_winner() {
        let store = MockChallengeStore::new();
        let now = Utc::now();
        store.put("key", challenge(now + Duration::minutes(5))).await.unwrap();

        let (a, b) = tokio::join!(store.consume("key", now), store.consume("key", now));
        let wins = [a.unwrap(), b.unwrap()].iter().filter(|r| r.is_some()).count();
        assert_eq!(wins, 1);
    }
}
