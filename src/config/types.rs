//! Configuration type definitions.

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub health: HealthConfig,
    /// Path of the JSON settings state file. Omitted = no persistence.
    pub state_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord: DiscordConfig::default(),
            sync: SyncConfig::default(),
            health: HealthConfig::default(),
            state_file: None,
        }
    }
}

/// Discord bot configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
}

/// Roster sync tuning knobs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    /// Maximum number of intro-channel messages scanned per rescan.
    pub history_cap: Option<usize>,
    /// Pause between consecutive auto-role grants, in milliseconds.
    pub role_grant_delay_ms: Option<u64>,
}

/// Keep-alive HTTP endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_health_port")]
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_health_port(),
        }
    }
}

fn default_health_port() -> u16 {
    8080
}
