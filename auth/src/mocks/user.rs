//! Mock user directory for testing.

use crate::error::Result;
use crate::providers::{User, UserDirectory};
use crate::state::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory user directory with plaintext password records.
///
/// Plaintext is fine here: hashing policy belongs to the real directory,
/// the mock only answers accept/reject.
#[derive(Debug, Clone)]
pub struct MockUserDirectory {
    users: Arc<Mutex<HashMap<UserId, (User, String)>>>,
}

impl MockUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a user with their password.
    pub fn add_user(&self, user: User, password: impl Into<String>) {
        let mut users = self.users.lock().unwrap();
        users.insert(user.user_id, (user, password.into()));
    }

    /// Replace a stored user record, keeping the password.
    ///
    /// Lets tests deactivate accounts or toggle enrollment mid-flow.
    pub fn update_user(&self, user: User) {
        let mut users = self.users.lock().unwrap();
        if let Some(entry) = users.get_mut(&user.user_id) {
            entry.0 = user;
        }
    }
}

impl Default for MockUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl UserDirectory for MockUserDirectory {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&user_id).map(|(user, _)| user.clone()))
    }

    async fn find_by_login(&self, username_or_email: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .find(|(user, _)| user.username == username_or_email || user.email == username_or_email)
            .map(|(user, _)| user.clone()))
    }

    async fn verify_password(&self, user_id: UserId, password: &str) -> Result<bool> {
        let users = self.users.lock().unwrap();
        Ok(users
            .get(&user_id)
            .is_some_and(|(_, stored)| {
                constant_time_eq::constant_time_eq(stored.as_bytes(), password.as_bytes())
            }))
    }
}
