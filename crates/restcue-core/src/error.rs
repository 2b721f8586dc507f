//! Core error types for restcue-core.
//!
//! Nothing in here is fatal to a running session: configuration errors are
//! rejected at the boundary and delivery errors are logged, so the worst
//! outcome is a missed or silent reminder.

use std::path::PathBuf;
use thiserror::Error;

use crate::notify::SoundKey;

/// Core error type for restcue-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Alert or sound delivery errors
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// The platform refused notification permission
    #[error("Notification permission denied")]
    PermissionDenied,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// The data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised by the notification and audio collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The alert could not be shown
    #[error("Failed to show alert: {0}")]
    AlertFailed(String),

    /// The alert could not be closed
    #[error("Failed to close alert: {0}")]
    CloseFailed(String),

    /// Audio playback was attempted before a user gesture unlocked it
    #[error("Audio is locked until the user interacts with the app")]
    AudioLocked,

    /// Playback of a sound failed
    #[error("Failed to play sound '{sound}': {message}")]
    SoundFailed { sound: SoundKey, message: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
