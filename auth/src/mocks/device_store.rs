//! Mock trusted-device store for testing.

use crate::error::Result;
use crate::providers::TrustedDeviceStore;
use crate::state::{TrustedDevice, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory trusted-device store keyed by `(user, token hash)`.
#[derive(Debug, Clone)]
pub struct MockTrustedDeviceStore {
    devices: Arc<Mutex<HashMap<(UserId, String), TrustedDevice>>>,
}

impl MockTrustedDeviceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            devices: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// All devices for a user (for assertions).
    #[must_use]
    pub fn get_all(&self, user_id: UserId) -> Vec<TrustedDevice> {
        self.devices
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect()
    }
}

impl Default for MockTrustedDeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TrustedDeviceStore for MockTrustedDeviceStore {
    async fn insert(&self, device: TrustedDevice) -> Result<()> {
        let mut devices = self.devices.lock().unwrap();
        devices.insert((device.user_id, device.token_hash.clone()), device);
        Ok(())
    }

    async fn find(&self, user_id: UserId, token_hash: &str) -> Result<Option<TrustedDevice>> {
        let devices = self.devices.lock().unwrap();
        Ok(devices.get(&(user_id, token_hash.to_string())).cloned())
    }

    async fn touch(
        &self,
        user_id: UserId,
        token_hash: &str,
        last_used_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut devices = self.devices.lock().unwrap();
        if let Some(device) = devices.get_mut(&(user_id, token_hash.to_string())) {
            device.last_used_at = last_used_at;
        }
        Ok(())
    }

    async fn revoke(&self, user_id: UserId, token_hash: &str) -> Result<bool> {
        let mut devices = self.devices.lock().unwrap();
        Ok(devices.remove(&(user_id, token_hash.to_string())).is_some())
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64> {
        let mut devices = self.devices.lock().unwrap();
        let before = devices.len();
        devices.retain(|(owner, _), _| *owner != user_id);
        Ok((before - devices.len()) as u64)
    }
}
