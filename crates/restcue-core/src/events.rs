use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notify::{AckPath, AlertId, Permission, SoundKey};
use crate::timer::{Phase, ProcessId, Profile};

/// Every state change in the orchestrator produces an Event.
/// Front ends drain them after each pump or command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ProcessStarted {
        process: ProcessId,
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ProcessPaused {
        process: ProcessId,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero; the process is parked until acknowledged.
    ProcessExpired {
        process: ProcessId,
        phase: Phase,
        at: DateTime<Utc>,
    },
    /// The process left its expired state and entered a new phase.
    ProcessRearmed {
        process: ProcessId,
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ProcessDisabled {
        process: ProcessId,
        at: DateTime<Utc>,
    },
    /// Idle display re-initialized without starting.
    ProcessPrimed {
        process: ProcessId,
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A notification was raised. `alert` is `None` when it could not be
    /// shown and was acknowledged on the spot.
    NotificationRaised {
        process: Option<ProcessId>,
        title: String,
        body: String,
        sound: SoundKey,
        alert: Option<AlertId>,
        at: DateTime<Utc>,
    },
    AlertAcknowledged {
        alert: AlertId,
        process: Option<ProcessId>,
        path: AckPath,
        at: DateTime<Utc>,
    },
    /// An acknowledgment arrived for a process that was disabled or reset
    /// since the alert was raised.
    StaleAcknowledgment {
        process: ProcessId,
        at: DateTime<Utc>,
    },
    ProfileChanged {
        profile: Option<Profile>,
        at: DateTime<Utc>,
    },
    HydrationReset {
        drank_ml: u64,
        at: DateTime<Utc>,
    },
    PermissionChanged {
        permission: Permission,
        at: DateTime<Utc>,
    },
    /// One-time advisory after the user denied notification permission.
    PermissionAdvisory {
        message: String,
        at: DateTime<Utc>,
    },
    ConfigRejected {
        key: String,
        value: String,
        message: String,
        at: DateTime<Utc>,
    },
    DeliveryFailed {
        message: String,
        at: DateTime<Utc>,
    },
    Reset {
        message: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::ProcessStarted { at, .. }
            | Event::ProcessPaused { at, .. }
            | Event::ProcessExpired { at, .. }
            | Event::ProcessRearmed { at, .. }
            | Event::ProcessDisabled { at, .. }
            | Event::ProcessPrimed { at, .. }
            | Event::NotificationRaised { at, .. }
            | Event::AlertAcknowledged { at, .. }
            | Event::StaleAcknowledgment { at, .. }
            | Event::ProfileChanged { at, .. }
            | Event::HydrationReset { at, .. }
            | Event::PermissionChanged { at, .. }
            | Event::PermissionAdvisory { at, .. }
            | Event::ConfigRejected { at, .. }
            | Event::DeliveryFailed { at, .. }
            | Event::Reset { at, .. } => *at,
        }
    }
}
