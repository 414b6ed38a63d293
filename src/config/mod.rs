//! Configuration parsing and types.

pub mod env;
pub mod parser;
pub mod types;

pub use types::*;

use crate::common::error::{ConfigError, ConfigResult};

/// Load configuration, apply env overrides, and validate.
///
/// A missing config file falls back to defaults so the bot can run on
/// environment variables alone.
pub fn load_and_validate(path: &str) -> ConfigResult<Config> {
    let config = match parser::load_config(path) {
        Ok(config) => config,
        Err(ConfigError::IoError { .. }) => {
            tracing::warn!("Config file '{}' not found, using defaults", path);
            Config::default()
        }
        Err(e) => return Err(e),
    };

    let config = env::apply_env_overrides(config);
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> ConfigResult<()> {
    if config.discord.token.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            message: "discord.token is required (config file or REGISTRAR_DISCORD_TOKEN)"
                .to_string(),
        });
    }
    if config.sync.history_cap == Some(0) {
        return Err(ConfigError::ValidationError {
            message: "sync.history_cap must be positive".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_token() {
        let config = Config::default();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_history_cap() {
        let mut config = Config::default();
        config.discord.token = "abc".to_string();
        config.sync.history_cap = Some(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_accepts_minimal() {
        let mut config = Config::default();
        config.discord.token = "abc".to_string();
        assert!(validate(&config).is_ok());
    }
}
