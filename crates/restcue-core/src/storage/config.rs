//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Work/break profile selection
//! - Eye-rest and posture reminder toggles and durations
//! - Hydration tracking and rate
//! - Notification sound preference
//!
//! Configuration is stored at `~/.config/restcue/config.toml`.
//!
//! Numeric fields must be positive. `set` rejects anything else and keeps
//! the previous value; `load` replaces bad values on disk with defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::{Phase, Profile};

/// Work/break cycle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkConfig {
    /// `None` hides the cycle and turns its controls into no-ops.
    #[serde(default)]
    pub profile: Option<Profile>,
}

/// 20-20-20 eye-rest reminder configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeRestConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Sit/stand reminder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_sit_minutes")]
    pub sit_minutes: u32,
    #[serde(default = "default_stand_minutes")]
    pub stand_minutes: u32,
}

/// Hydration tracking configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_ml_per_hour")]
    pub ml_per_hour: u32,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub sound: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/restcue/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub work: WorkConfig,
    #[serde(default)]
    pub eye_rest: EyeRestConfig,
    #[serde(default)]
    pub posture: PostureConfig,
    #[serde(default)]
    pub hydration: HydrationConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_sit_minutes() -> u32 {
    30
}
fn default_stand_minutes() -> u32 {
    10
}
fn default_ml_per_hour() -> u32 {
    500
}
fn default_true() -> bool {
    true
}

/// Keys that must hold positive integers.
const POSITIVE_KEYS: [&str; 3] = [
    "posture.sit_minutes",
    "posture.stand_minutes",
    "hydration.ml_per_hour",
];

impl Default for WorkConfig {
    fn default() -> Self {
        Self {
            profile: Some(Profile::Short),
        }
    }
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sit_minutes: default_sit_minutes(),
            stand_minutes: default_stand_minutes(),
        }
    }
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ml_per_hour: default_ml_per_hour(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { sound: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work: WorkConfig::default(),
            eye_rest: EyeRestConfig::default(),
            posture: PostureConfig::default(),
            hydration: HydrationConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => {
                        let b = value.trim().parse::<bool>().map_err(|_| {
                            ConfigError::invalid(key, format!("cannot parse '{value}' as true/false"))
                        })?;
                        serde_json::Value::Bool(b)
                    }
                    serde_json::Value::Number(_) => {
                        let n = value.trim().parse::<u32>().map_err(|_| {
                            ConfigError::invalid(key, format!("cannot parse '{value}' as a positive integer"))
                        })?;
                        serde_json::Value::Number(n.into())
                    }
                    _ => serde_json::Value::String(value.trim().into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Default config file location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// default config cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let mut cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.sanitize();
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some("none".to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value in memory by dot-separated key.
    ///
    /// On any error the config is left exactly as it was, so the last valid
    /// value stays in effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or a numeric value is not positive.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        if key == "work.profile" {
            self.work.profile = Profile::parse_selection(value)?;
            return Ok(());
        }

        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let candidate: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    /// Set a value by key and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value is invalid,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Check every numeric field is positive.
    ///
    /// # Errors
    ///
    /// Returns the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in POSITIVE_KEYS {
            if self.numeric(key) == Some(0) {
                return Err(ConfigError::invalid(key, "must be greater than zero"));
            }
        }
        Ok(())
    }

    /// Replace non-positive numeric fields with their defaults.
    pub fn sanitize(&mut self) {
        let defaults = Config::default();
        for key in POSITIVE_KEYS {
            if self.numeric(key) != Some(0) {
                continue;
            }
            tracing::warn!(key, "non-positive value in configuration, using default");
            match key {
                "posture.sit_minutes" => self.posture.sit_minutes = defaults.posture.sit_minutes,
                "posture.stand_minutes" => self.posture.stand_minutes = defaults.posture.stand_minutes,
                _ => self.hydration.ml_per_hour = defaults.hydration.ml_per_hour,
            }
        }
    }

    /// Configured length of `phase` in seconds, or `None` when the phase
    /// cannot run with the current settings.
    pub fn phase_secs(&self, phase: Phase) -> Option<u64> {
        let secs = match phase {
            Phase::Work => self.work.profile?.work_secs(),
            Phase::Break => self.work.profile?.break_secs(),
            Phase::Waiting => crate::timer::EYE_REST_PERIOD_SECS,
            Phase::Sitting => u64::from(self.posture.sit_minutes) * 60,
            Phase::Standing => u64::from(self.posture.stand_minutes) * 60,
        };
        (secs > 0).then_some(secs)
    }

    fn numeric(&self, key: &str) -> Option<u32> {
        match key {
            "posture.sit_minutes" => Some(self.posture.sit_minutes),
            "posture.stand_minutes" => Some(self.posture.stand_minutes),
            "hydration.ml_per_hour" => Some(self.hydration.ml_per_hour),
            _ => None,
        }
    }
}
