use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder stored when a user registers without a `dubina`.
pub const DEFAULT_DUBINA: &str = "не указано";
pub const STATUS_ACTIVE: &str = "active";

/// A registered user as exposed to clients. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub username: String,
    pub dubina: String,
    pub age: u32,
    pub registered_at: DateTime<Utc>,
    pub status: String,
}

/// The persisted form of a user: the public record plus the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    #[serde(flatten)]
    pub user: User,
    pub password_hash: String,
}

impl StoredUser {
    pub fn id(&self) -> u64 {
        self.user.id
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }
}

/// Record shape of the old flat `users.json` (plaintext passwords, age as
/// whatever the form sent).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyUser {
    pub id: u64,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub dubina: Option<String>,
    #[serde(default)]
    pub age: Option<serde_json::Value>,
    #[serde(default)]
    pub registered_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
