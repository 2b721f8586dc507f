//! # restcue Core Library
//!
//! Core logic for restcue, a wellness reminder engine: a work/break cycle
//! plus eye-rest, posture and hydration reminders that alert the user and
//! wait for an explicit acknowledgment before carrying on.
//!
//! ## Architecture
//!
//! - **Timer queue**: a deterministic delayed/repeating callback queue,
//!   pumped by the host with the current time from an injected [`Clock`]
//! - **Countdown processes**: per-second state machines that park at zero
//!   until their notification is acknowledged
//! - **Hydration accumulator**: continuously accruing water debt, surfaced as
//!   a hint on every notification
//! - **Acknowledgment gate**: shows alerts and resumes the originating
//!   process exactly once, whichever way the alert is resolved
//! - **Orchestrator**: owns all of the above and maps user controls onto them
//!
//! Everything runs on a single thread; there are no locks and no internal
//! timers.

pub mod error;
pub mod events;
pub mod hydration;
pub mod notify;
pub mod orchestrator;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DeliveryError};
pub use events::Event;
pub use hydration::HydrationAccumulator;
pub use notify::{
    AckPath, AcknowledgmentGate, AlertId, AudioPlayer, Continuation, NotificationRequest, Notifier,
    Permission, SoundKey,
};
pub use orchestrator::{Orchestrator, ProcessView, Snapshot};
pub use storage::Config;
pub use timer::{
    Clock, CountdownProcess, ManualClock, Phase, ProcessId, ProcessState, Profile, SystemClock,
    TimerQueue,
};
