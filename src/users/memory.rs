//! In-memory user storage for tests and ephemeral servers.

use std::collections::BTreeMap;

use anyhow::Result;
use tokio::sync::Mutex;

use super::{StoredUser, UserStore};

pub struct MemoryUserStore {
    users: Mutex<BTreeMap<u64, StoredUser>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryUserStore {
    async fn list_users(&self) -> Result<Vec<StoredUser>> {
        let users = self.users.lock().await;
        Ok(users.values().cloned().collect())
    }

    async fn get_user(&self, id: u64) -> Result<Option<StoredUser>> {
        let users = self.users.lock().await;
        Ok(users.get(&id).cloned())
    }

    async fn save_user(&self, user: &StoredUser) -> Result<()> {
        let mut users = self.users.lock().await;
        users.insert(user.id(), user.clone());
        Ok(())
    }
}
