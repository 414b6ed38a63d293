//! Per-guild settings and their in-memory store.
//!
//! The store is an explicit object handed to the engine and the command
//! surface, guarded for the multithreaded tokio runtime. An optional
//! persistence adapter saves the full settings table after every
//! mutation so a restart does not lose channel bindings.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::warn;

use crate::common::error::PersistError;
use crate::roster::matcher::DEFAULT_IGN_MAX_LENGTH;

/// Default keyword announcing an in-game name in an intro message.
pub const DEFAULT_IGN_KEYWORD: &str = "ชื่อในเกม";

/// Per-guild configuration for the intro -> summary sync feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSettings {
    /// Master switch; nothing runs while false.
    pub enabled: bool,
    /// Intro / register channel.
    pub source_channel_id: Option<ChannelId>,
    /// Summary destination channel.
    pub summary_channel_id: Option<ChannelId>,
    /// Members holding any of these roles are omitted from the roster.
    pub excluded_role_ids: HashSet<RoleId>,
    /// Keywords used to detect the in-game name, tried in order.
    pub ign_keywords: Vec<String>,
    /// Upper bound on a captured name, in characters.
    pub ign_max_length: usize,
    /// Role granted on a qualifying introduction.
    pub auto_role_id: Option<RoleId>,
    /// Reserved: role marking newcomers; stored and reported only.
    pub newbie_role_id: Option<RoleId>,
    /// Currently-live summary messages, in display order. This is the
    /// convergence baseline and holds exactly the ids last written.
    pub summary_message_ids: Vec<MessageId>,
    /// Time of the last fully successful rescan.
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            source_channel_id: None,
            summary_channel_id: None,
            excluded_role_ids: HashSet::new(),
            ign_keywords: vec![DEFAULT_IGN_KEYWORD.to_string()],
            ign_max_length: DEFAULT_IGN_MAX_LENGTH,
            auto_role_id: None,
            newbie_role_id: None,
            summary_message_ids: Vec::new(),
            last_synced_at: None,
        }
    }
}

impl GuildSettings {
    /// Both channels bound and the feature switched on.
    pub fn is_runnable(&self) -> bool {
        self.enabled && self.source_channel_id.is_some() && self.summary_channel_id.is_some()
    }
}

/// Load/save adapter for the settings table.
pub trait SettingsPersistence: Send + Sync {
    fn load(&self) -> Result<HashMap<GuildId, GuildSettings>, PersistError>;
    fn save(&self, settings: &HashMap<GuildId, GuildSettings>) -> Result<(), PersistError>;
}

/// JSON file persistence adapter.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsPersistence for JsonFileStore {
    fn load(&self) -> Result<HashMap<GuildId, GuildSettings>, PersistError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, settings: &HashMap<GuildId, GuildSettings>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// In-memory settings table keyed by guild, with per-guild rescan locks.
pub struct SettingsStore {
    guilds: RwLock<HashMap<GuildId, GuildSettings>>,
    /// One mutex per guild serializing rescans; serenity dispatches
    /// events in parallel, so overlapping rescans for the same guild
    /// would corrupt `summary_message_ids` without this.
    rescan_locks: Mutex<HashMap<GuildId, Arc<Mutex<()>>>>,
    persistence: Option<Box<dyn SettingsPersistence>>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self {
            guilds: RwLock::new(HashMap::new()),
            rescan_locks: Mutex::new(HashMap::new()),
            persistence: None,
        }
    }

    /// Create a store backed by a persistence adapter, loading any
    /// previously saved settings table.
    pub fn with_persistence(
        persistence: Box<dyn SettingsPersistence>,
    ) -> Result<Self, PersistError> {
        let guilds = persistence.load()?;
        Ok(Self {
            guilds: RwLock::new(guilds),
            rescan_locks: Mutex::new(HashMap::new()),
            persistence: Some(persistence),
        })
    }

    /// Clone of the guild's settings, inserting defaults on first access.
    pub async fn snapshot(&self, guild_id: GuildId) -> GuildSettings {
        let mut guilds = self.guilds.write().await;
        guilds.entry(guild_id).or_default().clone()
    }

    /// Mutate the guild's settings in place and save, inserting
    /// defaults on first access. Returns the updated settings.
    pub async fn update<F>(&self, guild_id: GuildId, mutate: F) -> GuildSettings
    where
        F: FnOnce(&mut GuildSettings),
    {
        let updated = {
            let mut guilds = self.guilds.write().await;
            let settings = guilds.entry(guild_id).or_default();
            mutate(settings);
            settings.clone()
        };
        self.save().await;
        updated
    }

    /// Acquire the guild's rescan lock.
    pub async fn rescan_lock(&self, guild_id: GuildId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.rescan_locks.lock().await;
            locks.entry(guild_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Best-effort save through the persistence adapter, if any.
    async fn save(&self) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        let guilds = self.guilds.read().await;
        if let Err(e) = persistence.save(&guilds) {
            warn!("Failed to save settings state: {}", e);
        }
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_creates_defaults() {
        let store = SettingsStore::new();
        let settings = store.snapshot(GuildId::new(1)).await;
        assert!(!settings.enabled);
        assert_eq!(settings.ign_keywords, vec![DEFAULT_IGN_KEYWORD.to_string()]);
        assert_eq!(settings.ign_max_length, DEFAULT_IGN_MAX_LENGTH);
        assert!(settings.summary_message_ids.is_empty());
    }

    #[tokio::test]
    async fn test_update_mutates_in_place() {
        let store = SettingsStore::new();
        let guild = GuildId::new(1);

        store
            .update(guild, |s| {
                s.enabled = true;
                s.source_channel_id = Some(ChannelId::new(10));
            })
            .await;

        let settings = store.snapshot(guild).await;
        assert!(settings.enabled);
        assert_eq!(settings.source_channel_id, Some(ChannelId::new(10)));
    }

    #[tokio::test]
    async fn test_guilds_are_isolated() {
        let store = SettingsStore::new();
        store.update(GuildId::new(1), |s| s.enabled = true).await;

        assert!(store.snapshot(GuildId::new(1)).await.enabled);
        assert!(!store.snapshot(GuildId::new(2)).await.enabled);
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "registrar-settings-test-{}.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);

        {
            let store =
                SettingsStore::with_persistence(Box::new(JsonFileStore::new(&path))).unwrap();
            store
                .update(GuildId::new(7), |s| {
                    s.enabled = true;
                    s.summary_channel_id = Some(ChannelId::new(42));
                    s.summary_message_ids = vec![MessageId::new(100), MessageId::new(101)];
                })
                .await;
        }

        let reloaded =
            SettingsStore::with_persistence(Box::new(JsonFileStore::new(&path))).unwrap();
        let settings = reloaded.snapshot(GuildId::new(7)).await;
        assert!(settings.enabled);
        assert_eq!(settings.summary_channel_id, Some(ChannelId::new(42)));
        assert_eq!(
            settings.summary_message_ids,
            vec![MessageId::new(100), MessageId::new(101)]
        );

        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_missing_state_file_loads_empty() {
        let path = std::env::temp_dir().join("registrar-settings-test-missing.json");
        let _ = fs::remove_file(&path);
        let store = SettingsStore::with_persistence(Box::new(JsonFileStore::new(&path))).unwrap();
        assert!(!store.snapshot(GuildId::new(1)).await.enabled);
    }
}
