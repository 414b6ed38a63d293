//! Configuration file parsing (HOCON format).

use std::path::Path;

use hocon::HoconLoader;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Load configuration from a HOCON string.
#[cfg(test)]
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = load_config_str(r#"discord { token = "abc" }"#).unwrap();
        assert_eq!(config.discord.token, "abc");
        assert!(config.state_file.is_none());
        assert!(!config.health.enabled);
    }

    #[test]
    fn test_parse_full_config() {
        let config = load_config_str(
            r#"
            discord { token = "abc" }
            sync {
              history_cap = 500
              role_grant_delay_ms = 100
            }
            health { enabled = true, port = 9000 }
            state_file = "state.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.sync.history_cap, Some(500));
        assert_eq!(config.sync.role_grant_delay_ms, Some(100));
        assert!(config.health.enabled);
        assert_eq!(config.health.port, 9000);
        assert_eq!(config.state_file.as_deref(), Some("state.json"));
    }
}
