use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Named preset bundling work and break lengths for the work/break cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Short,
    Medium,
    Long,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Short, Profile::Medium, Profile::Long];

    /// Work length in minutes.
    pub fn work_min(self) -> u64 {
        match self {
            Profile::Short => 25,
            Profile::Medium => 50,
            Profile::Long => 90,
        }
    }

    /// Break length in minutes.
    pub fn break_min(self) -> u64 {
        match self {
            Profile::Short => 5,
            Profile::Medium => 10,
            Profile::Long => 20,
        }
    }

    pub fn work_secs(self) -> u64 {
        self.work_min().saturating_mul(60)
    }

    pub fn break_secs(self) -> u64 {
        self.break_min().saturating_mul(60)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Short => "short",
            Profile::Medium => "medium",
            Profile::Long => "long",
        }
    }

    /// Parse a selector value where `none` (or an empty string) means no profile.
    pub fn parse_selection(value: &str) -> Result<Option<Profile>, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(None),
            other => other.parse().map(Some),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Profile::Short),
            "medium" => Ok(Profile::Medium),
            "long" => Ok(Profile::Long),
            other => Err(ConfigError::invalid(
                "work.profile",
                format!("unknown profile '{other}' (expected short, medium, long or none)"),
            )),
        }
    }
}
