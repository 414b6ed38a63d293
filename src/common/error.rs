//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Settings persistence errors.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("State file IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State file format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Coarse classification of Discord API failures.
///
/// The sync engine swallows `NotFound` per item, treats `Forbidden` as
/// "not possible" and degrades, and propagates `Other` up to the
/// command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFailure {
    NotFound,
    Forbidden,
    Other,
}

/// Classify a serenity error by the underlying HTTP status.
pub fn classify_api_error(error: &serenity::Error) -> ApiFailure {
    use serenity::http::{HttpError, StatusCode};

    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) = error {
        return match response.status_code {
            StatusCode::NOT_FOUND => ApiFailure::NotFound,
            StatusCode::FORBIDDEN => ApiFailure::Forbidden,
            _ => ApiFailure::Other,
        };
    }
    ApiFailure::Other
}

/// Result type alias for config operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
