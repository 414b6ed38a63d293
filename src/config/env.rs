//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `REGISTRAR_DISCORD_TOKEN` - Discord bot token
//! - `REGISTRAR_STATE_FILE` - settings state file path
//! - `REGISTRAR_HEALTH_PORT` - keep-alive endpoint port
//! - `REGISTRAR_CONFIG` - config file path

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "REGISTRAR";

/// Apply environment variable overrides to a config.
///
/// This allows the token and deployment paths to be provided via the
/// environment instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.discord.token = token;
    }

    if let Ok(path) = env::var(format!("{}_STATE_FILE", ENV_PREFIX)) {
        config.state_file = Some(path);
    }

    if let Ok(port) = env::var(format!("{}_HEALTH_PORT", ENV_PREFIX)) {
        if let Ok(port) = port.parse() {
            config.health.enabled = true;
            config.health.port = port;
        }
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `REGISTRAR_CONFIG`, otherwise returns "registrar.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "registrar.conf".to_string())
}
