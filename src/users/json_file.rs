use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::warn;

use super::{StoredUser, UserStore};

/// JSON file-based user storage.
///
/// Directory structure:
/// ```text
/// data/
///   users/
///     {id}/
///       user.json
/// ```
pub struct JsonFileUserStore {
    base_path: PathBuf,
}

impl JsonFileUserStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn users_dir(&self) -> PathBuf {
        self.base_path.join("users")
    }

    fn user_file(&self, id: u64) -> PathBuf {
        self.users_dir().join(id.to_string()).join("user.json")
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read file"),
        }
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;

        // Replaced atomically via rename.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .context("Failed to write file")?;
        fs::rename(&tmp, path)
            .await
            .context("Failed to replace file")?;
        Ok(())
    }

    /// Ids of the numeric directories under `users/`.
    async fn list_ids(&self) -> Result<Vec<u64>> {
        let mut ids = Vec::new();

        let mut entries = match fs::read_dir(self.users_dir()).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e).context("Failed to read directory"),
        };

        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            if !entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name();
            match name.to_str().and_then(|n| n.parse::<u64>().ok()) {
                Some(id) => ids.push(id),
                None => warn!(entry = ?name, "skipping non-numeric entry in users directory"),
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl UserStore for JsonFileUserStore {
    async fn list_users(&self) -> Result<Vec<StoredUser>> {
        let mut users = Vec::new();
        for id in self.list_ids().await? {
            if let Some(user) = self.get_user(id).await? {
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn get_user(&self, id: u64) -> Result<Option<StoredUser>> {
        self.read_json(&self.user_file(id)).await
    }

    async fn save_user(&self, user: &StoredUser) -> Result<()> {
        self.write_json(&self.user_file(user.id()), user).await
    }
}
