use anyhow::Result;

use super::StoredUser;

/// Storage trait for registered users.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// All users, ordered by id.
    async fn list_users(&self) -> Result<Vec<StoredUser>>;
    async fn get_user(&self, id: u64) -> Result<Option<StoredUser>>;
    async fn save_user(&self, user: &StoredUser) -> Result<()>;

    async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>> {
        Ok(self
            .list_users()
            .await?
            .into_iter()
            .find(|user| user.username() == username))
    }

    /// Id for the next registration: one past the highest existing id.
    async fn next_id(&self) -> Result<u64> {
        Ok(self
            .list_users()
            .await?
            .iter()
            .map(StoredUser::id)
            .max()
            .unwrap_or(0)
            + 1)
    }
}
