//! Core error types for drift-core.
//!
//! Every fallible operation in the library returns [`CoreError`]. Nothing is
//! retried or swallowed: failures surface to the caller as soon as they occur.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for drift-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The persisted snapshot exists but does not match the state schema.
    #[error("Malformed snapshot under key '{key}': {source}")]
    Snapshot {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Key-value store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Could not locate or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),

    /// Read failed
    #[error("Failed to read key '{key}': {message}")]
    ReadFailed { key: String, message: String },

    /// Write failed
    #[error("Failed to write key '{key}': {message}")]
    WriteFailed { key: String, message: String },

    /// Database is locked
    #[error("Store is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors for engine operation arguments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Durations must be at least one minute
    #[error("Invalid minutes for '{activity}': must be greater than zero")]
    ZeroMinutes { activity: String },

    /// Activity names must contain a non-whitespace character
    #[error("Activity name must not be blank")]
    BlankActivity,

    /// Category string is neither "doom" nor "good"
    #[error("Unknown category '{0}': expected \"doom\" or \"good\"")]
    UnknownCategory(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_converts_into_core_error() {
        let err: CoreError = ValidationError::BlankActivity.into();
        assert!(matches!(err, CoreError::Validation(ValidationError::BlankActivity)));
        assert_eq!(
            err.to_string(),
            "Validation error: Activity name must not be blank"
        );
    }

    #[test]
    fn unknown_category_message_names_the_input() {
        let err = ValidationError::UnknownCategory("meh".into());
        assert!(err.to_string().contains("'meh'"));
    }
}
