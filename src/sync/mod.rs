//! Roster synchronization: per-guild settings state and the engine
//! that converges the summary channel onto freshly rendered content.

pub mod engine;
pub mod settings;

pub use engine::SyncEngine;
pub use settings::{GuildSettings, JsonFileStore, SettingsPersistence, SettingsStore};
