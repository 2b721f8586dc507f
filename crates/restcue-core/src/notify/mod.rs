//! Notification delivery boundary.
//!
//! The core talks to the platform through two traits: [`Notifier`] for
//! permission and persistent alerts, [`AudioPlayer`] for sounds. Interaction
//! events travel back in through `Orchestrator::acknowledge`.

mod gate;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DeliveryError};
use crate::timer::{Phase, ProcessId};

pub use gate::{AcknowledgmentGate, Presented};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// The user has not been asked yet.
    Default,
}

/// Which user action resolved an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckPath {
    /// The user clicked the alert body.
    Interact,
    /// The alert was closed.
    Dismiss,
}

/// Platform handle for a shown alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub u64);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundKey {
    Main,
    Twenty,
    Stand,
}

impl SoundKey {
    pub const ALL: [SoundKey; 3] = [SoundKey::Main, SoundKey::Twenty, SoundKey::Stand];

    pub fn as_str(self) -> &'static str {
        match self {
            SoundKey::Main => "main",
            SoundKey::Twenty => "twenty",
            SoundKey::Stand => "stand",
        }
    }
}

impl fmt::Display for SoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoundKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" => Ok(SoundKey::Main),
            "twenty" => Ok(SoundKey::Twenty),
            "stand" => Ok(SoundKey::Stand),
            other => Err(ConfigError::invalid(
                "sound",
                format!("unknown sound '{other}' (expected main, twenty or stand)"),
            )),
        }
    }
}

/// What to do once an alert is acknowledged.
///
/// A plain value rather than a closure: the gate hands it back exactly once
/// and the orchestrator applies it against the current process records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Continuation {
    /// Resume `process` into `next_phase`, if it is still the same life of
    /// the process (`epoch`) that raised the alert.
    Resume {
        process: ProcessId,
        epoch: u64,
        next_phase: Phase,
    },
    /// Nothing to resume (test notifications).
    Noop,
}

impl Continuation {
    pub fn process(&self) -> Option<ProcessId> {
        match self {
            Continuation::Resume { process, .. } => Some(*process),
            Continuation::Noop => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub sound: SoundKey,
    pub on_acknowledge: Continuation,
}

impl NotificationRequest {
    /// Build a request, appending `hint` to `body` when it is non-empty.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        hint: &str,
        sound: SoundKey,
        on_acknowledge: Continuation,
    ) -> Self {
        let mut body = body.into();
        if !hint.is_empty() {
            body.push(' ');
            body.push_str(hint);
        }
        Self {
            title: title.into(),
            body,
            sound,
            on_acknowledge,
        }
    }

    pub fn origin(&self) -> Option<ProcessId> {
        self.on_acknowledge.process()
    }
}

/// Permission and persistent alert delivery.
pub trait Notifier {
    /// Ask the user for permission. Only ever answers `Granted` or `Denied`.
    fn request_permission(&mut self) -> Permission;

    fn permission(&self) -> Permission;

    /// Show an alert. Persistent alerts stay until the user acts on them.
    fn show_alert(&mut self, title: &str, body: &str, persistent: bool) -> Result<AlertId, DeliveryError>;

    /// Close an alert programmatically. Platforms usually follow this with a
    /// dismiss event for the same alert.
    fn close(&mut self, alert: AlertId) -> Result<(), DeliveryError>;
}

/// Sound playback.
pub trait AudioPlayer {
    /// Called once after a user gesture; playback may fail before that.
    fn unlock(&mut self);

    fn play(&mut self, sound: SoundKey) -> Result<(), DeliveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_appends_non_empty_hint() {
        let req = NotificationRequest::new(
            "20-20-20 Rule",
            "Look at something 20 feet away for 20 seconds.",
            "Time to hydrate! Drink ~120ml of water.",
            SoundKey::Twenty,
            Continuation::Noop,
        );
        assert_eq!(
            req.body,
            "Look at something 20 feet away for 20 seconds. Time to hydrate! Drink ~120ml of water."
        );
    }

    #[test]
    fn request_without_hint_has_no_trailing_space() {
        let req = NotificationRequest::new("Time to Sit", "Time to sit for 30 minutes.", "", SoundKey::Stand, Continuation::Noop);
        assert_eq!(req.body, "Time to sit for 30 minutes.");
        assert_eq!(req.origin(), None);
    }

    #[test]
    fn sound_key_parses_case_insensitively() {
        assert_eq!("Twenty".parse::<SoundKey>().unwrap(), SoundKey::Twenty);
        assert!("bell".parse::<SoundKey>().is_err());
    }
}
