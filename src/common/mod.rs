//! Common utilities and types shared across the application.

pub mod error;

pub use error::{classify_api_error, ApiFailure, ConfigError, PersistError};
