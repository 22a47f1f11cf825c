//! Import of the old flat `users.json` into a [`UserStore`].

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use super::password::hash_password;
use super::service::parse_age;
use super::{LegacyUser, StoredUser, User, UserStore, DEFAULT_DUBINA, STATUS_ACTIVE};
use crate::clock::Clock;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: usize,
    pub skipped: usize,
}

/// Parse a legacy `registeredAt` value.
///
/// Offset-less timestamps (the usual shape, with or without fractional
/// seconds) are taken to be local time in `tz`.
pub fn parse_legacy_timestamp(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn convert(legacy: LegacyUser, clock: &dyn Clock) -> Option<StoredUser> {
    let age = match parse_age(legacy.age.as_ref()) {
        Ok(age) => u32::try_from(age).ok(),
        Err(_) => None,
    };
    let Some(age) = age else {
        warn!(user_id = legacy.id, age = ?legacy.age, "skipping legacy user with invalid age");
        return None;
    };

    let registered_at = match legacy.registered_at.as_deref() {
        Some(raw) => match parse_legacy_timestamp(raw, clock.timezone()) {
            Some(ts) => ts,
            None => {
                warn!(user_id = legacy.id, registered_at = raw, "unreadable timestamp, using now");
                clock.now()
            }
        },
        None => clock.now(),
    };

    Some(StoredUser {
        user: User {
            id: legacy.id,
            username: legacy.username,
            dubina: legacy.dubina.unwrap_or_else(|| DEFAULT_DUBINA.to_string()),
            age,
            registered_at,
            status: legacy.status.unwrap_or_else(|| STATUS_ACTIVE.to_string()),
        },
        password_hash: hash_password(&legacy.password),
    })
}

/// Copy users from a legacy `users.json` array into `store`.
///
/// Ids are preserved and plaintext passwords are replaced by hashes. Users
/// whose id or username already exists in the store are skipped, so the
/// import can be re-run safely.
pub async fn migrate_legacy_users(
    path: &Path,
    store: &dyn UserStore,
    clock: &dyn Clock,
) -> Result<MigrationReport> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read legacy users file: {}", path.display()))?;
    let legacy: Vec<LegacyUser> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse legacy users file: {}", path.display()))?;

    let mut report = MigrationReport::default();
    for user in legacy {
        let exists = store.get_user(user.id).await?.is_some()
            || store.find_by_username(&user.username).await?.is_some();
        if exists {
            info!(user_id = user.id, username = %user.username, "already present, skipping");
            report.skipped += 1;
            continue;
        }

        match convert(user, clock) {
            Some(stored) => {
                store.save_user(&stored).await?;
                report.migrated += 1;
            }
            None => report.skipped += 1,
        }
    }

    info!(
        migrated = report.migrated,
        skipped = report.skipped,
        "legacy user migration finished"
    );
    Ok(report)
}
