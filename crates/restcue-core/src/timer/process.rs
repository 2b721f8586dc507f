//! Countdown process state machine.
//!
//! A process counts down once per second on the shared [`TimerQueue`]. It has
//! no thread and no clock of its own: the owner feeds it `tick()` whenever a
//! [`Wakeup::Tick`] for this process pops off the queue.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused          (pause/resume: work cycle only)
//!           |
//!           v
//!   ExpiredAwaitingAck -> Running     (rearm after acknowledgment)
//!
//! any state -> Idle                   (disable / prime)
//! ```

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::queue::{TimerQueue, Wakeup};
use crate::error::ConfigError;
use crate::notify::SoundKey;

/// Fixed period of the eye-rest cycle.
pub const EYE_REST_PERIOD_SECS: u64 = 20 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessId {
    Work,
    EyeRest,
    Posture,
}

impl ProcessId {
    pub const ALL: [ProcessId; 3] = [ProcessId::Work, ProcessId::EyeRest, ProcessId::Posture];

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessId::Work => "work",
            ProcessId::EyeRest => "eye_rest",
            ProcessId::Posture => "posture",
        }
    }

    /// Phase a freshly enabled process starts in.
    pub fn initial_phase(self) -> Phase {
        match self {
            ProcessId::Work => Phase::Work,
            ProcessId::EyeRest => Phase::Waiting,
            ProcessId::Posture => Phase::Sitting,
        }
    }

    pub fn sound(self) -> SoundKey {
        match self {
            ProcessId::Work => SoundKey::Main,
            ProcessId::EyeRest => SoundKey::Twenty,
            ProcessId::Posture => SoundKey::Stand,
        }
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Work,
    Break,
    /// The only phase of the eye-rest cycle.
    Waiting,
    Sitting,
    Standing,
}

impl Phase {
    /// Phase entered after an acknowledged expiry.
    pub fn next(self) -> Phase {
        match self {
            Phase::Work => Phase::Break,
            Phase::Break => Phase::Work,
            Phase::Waiting => Phase::Waiting,
            Phase::Sitting => Phase::Standing,
            Phase::Standing => Phase::Sitting,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Idle,
    Running,
    Paused,
    /// Notification raised; countdown frozen at zero until acknowledged.
    ExpiredAwaitingAck,
}

/// Result of feeding one tick to a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The process was not running; a stale tick.
    Ignored,
    Counting,
    /// Remaining time hit zero on this tick.
    Expired,
}

#[derive(Debug, Clone)]
pub struct CountdownProcess {
    id: ProcessId,
    phase: Phase,
    state: ProcessState,
    remaining_secs: u64,
    enabled: bool,
    /// Bumped whenever the process is disabled or re-initialized, so a
    /// continuation captured earlier can tell it is stale.
    epoch: u64,
}

impl CountdownProcess {
    /// Create a disabled, idle process.
    pub fn new(id: ProcessId) -> Self {
        Self {
            id,
            phase: id.initial_phase(),
            state: ProcessState::Idle,
            remaining_secs: 0,
            enabled: false,
            epoch: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_suspended_awaiting_ack(&self) -> bool {
        self.state == ProcessState::ExpiredAwaitingAck
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format_mm_ss(self.remaining_secs)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Re-initialize to an idle display without starting the countdown.
    pub fn prime(&mut self, queue: &mut TimerQueue, phase: Phase, duration_secs: u64, enabled: bool) {
        self.cancel_schedule(queue);
        self.epoch += 1;
        self.enabled = enabled;
        self.phase = phase;
        self.remaining_secs = duration_secs;
        self.state = ProcessState::Idle;
    }

    /// Start counting down `duration_secs` in `phase` from `now`.
    ///
    /// A zero duration is rejected and leaves the process idle.
    pub fn enable(
        &mut self,
        queue: &mut TimerQueue,
        now: DateTime<Utc>,
        phase: Phase,
        duration_secs: u64,
    ) -> Result<(), ConfigError> {
        self.cancel_schedule(queue);
        self.epoch += 1;
        if duration_secs == 0 {
            self.enabled = false;
            self.remaining_secs = 0;
            self.state = ProcessState::Idle;
            return Err(ConfigError::invalid(
                self.id.as_str(),
                "duration must be greater than zero",
            ));
        }
        self.enabled = true;
        self.phase = phase;
        self.remaining_secs = duration_secs;
        self.arm(queue, now);
        tracing::info!(process = %self.id, ?phase, duration_secs, "process enabled");
        Ok(())
    }

    /// Idle or Paused -> Running. Returns false when nothing changed.
    pub fn start(&mut self, queue: &mut TimerQueue, now: DateTime<Utc>) -> bool {
        if !self.enabled || self.remaining_secs == 0 {
            return false;
        }
        match self.state {
            ProcessState::Idle | ProcessState::Paused => {
                self.arm(queue, now);
                true
            }
            ProcessState::Running | ProcessState::ExpiredAwaitingAck => false,
        }
    }

    /// Running -> Paused. Returns false when nothing changed.
    pub fn pause(&mut self, queue: &mut TimerQueue) -> bool {
        if self.state != ProcessState::Running {
            return false;
        }
        self.cancel_schedule(queue);
        self.state = ProcessState::Paused;
        true
    }

    /// Count one second down.
    ///
    /// On reaching zero the process parks in `ExpiredAwaitingAck` and its
    /// tick callback is cancelled; further ticks are ignored until `rearm`.
    pub fn tick(&mut self, queue: &mut TimerQueue) -> TickOutcome {
        if self.state != ProcessState::Running {
            return TickOutcome::Ignored;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return TickOutcome::Counting;
        }
        self.cancel_schedule(queue);
        self.state = ProcessState::ExpiredAwaitingAck;
        tracing::info!(process = %self.id, phase = ?self.phase, "process expired, awaiting acknowledgment");
        TickOutcome::Expired
    }

    /// Leave `ExpiredAwaitingAck` and run `phase` for `duration_secs`.
    pub fn rearm(
        &mut self,
        queue: &mut TimerQueue,
        now: DateTime<Utc>,
        phase: Phase,
        duration_secs: u64,
    ) -> Result<(), ConfigError> {
        if self.state != ProcessState::ExpiredAwaitingAck {
            return Err(ConfigError::invalid(
                self.id.as_str(),
                "process is not awaiting acknowledgment",
            ));
        }
        if duration_secs == 0 {
            return Err(ConfigError::invalid(
                self.id.as_str(),
                "duration must be greater than zero",
            ));
        }
        self.phase = phase;
        self.remaining_secs = duration_secs;
        self.arm(queue, now);
        tracing::info!(process = %self.id, ?phase, duration_secs, "process re-armed");
        Ok(())
    }

    /// Cancel all scheduled work and return to a cleared idle state.
    pub fn disable(&mut self, queue: &mut TimerQueue) {
        self.cancel_schedule(queue);
        self.epoch += 1;
        self.enabled = false;
        self.remaining_secs = 0;
        self.state = ProcessState::Idle;
        tracing::info!(process = %self.id, "process disabled");
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn arm(&mut self, queue: &mut TimerQueue, now: DateTime<Utc>) {
        self.cancel_schedule(queue);
        queue.set_interval(now, Duration::seconds(1), Wakeup::Tick(self.id));
        self.state = ProcessState::Running;
    }

    fn cancel_schedule(&mut self, queue: &mut TimerQueue) {
        queue.cancel_owned_by(self.id);
    }
}

/// Format seconds as zero-padded `MM:SS`. Minutes are not wrapped into hours.
pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn run_ticks(p: &mut CountdownProcess, q: &mut TimerQueue, until: DateTime<Utc>) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        while let Some(due) = q.pop_due(until) {
            assert_eq!(due.wakeup, Wakeup::Tick(p.id()));
            outcomes.push(p.tick(q));
        }
        outcomes
    }

    #[test]
    fn format_pads_minutes_and_seconds() {
        assert_eq!(format_mm_ss(0), "00:00");
        assert_eq!(format_mm_ss(65), "01:05");
        assert_eq!(format_mm_ss(1500), "25:00");
        assert_eq!(format_mm_ss(100 * 60), "100:00");
    }

    #[test]
    fn enable_rejects_zero_duration() {
        let mut q = TimerQueue::new();
        let mut p = CountdownProcess::new(ProcessId::Posture);
        assert!(p.enable(&mut q, t0(), Phase::Sitting, 0).is_err());
        assert_eq!(p.state(), ProcessState::Idle);
        assert!(!p.is_enabled());
        assert!(q.is_empty());
    }

    #[test]
    fn counts_down_and_parks_at_zero() {
        let mut q = TimerQueue::new();
        let mut p = CountdownProcess::new(ProcessId::EyeRest);
        p.enable(&mut q, t0(), Phase::Waiting, 3).unwrap();

        let outcomes = run_ticks(&mut p, &mut q, t0() + Duration::seconds(10));
        assert_eq!(
            outcomes,
            vec![TickOutcome::Counting, TickOutcome::Counting, TickOutcome::Expired]
        );
        assert!(p.is_suspended_awaiting_ack());
        assert_eq!(p.remaining_secs(), 0);
        assert_eq!(q.armed_for(ProcessId::EyeRest), 0);
    }

    #[test]
    fn tick_while_expired_is_ignored() {
        let mut q = TimerQueue::new();
        let mut p = CountdownProcess::new(ProcessId::EyeRest);
        p.enable(&mut q, t0(), Phase::Waiting, 1).unwrap();
        run_ticks(&mut p, &mut q, t0() + Duration::seconds(1));

        assert_eq!(p.tick(&mut q), TickOutcome::Ignored);
        assert!(p.is_suspended_awaiting_ack());
    }

    #[test]
    fn pause_and_start_keep_remaining_time() {
        let mut q = TimerQueue::new();
        let mut p = CountdownProcess::new(ProcessId::Work);
        p.prime(&mut q, Phase::Work, 10, true);
        assert!(p.start(&mut q, t0()));
        run_ticks(&mut p, &mut q, t0() + Duration::seconds(4));
        assert_eq!(p.remaining_secs(), 6);

        assert!(p.pause(&mut q));
        assert!(!p.pause(&mut q));
        assert!(q.is_empty());

        let later = t0() + Duration::minutes(30);
        assert!(p.start(&mut q, later));
        run_ticks(&mut p, &mut q, later + Duration::seconds(1));
        assert_eq!(p.remaining_secs(), 5);
    }

    #[test]
    fn start_requires_enabled_and_time_left() {
        let mut q = TimerQueue::new();
        let mut p = CountdownProcess::new(ProcessId::Work);
        assert!(!p.start(&mut q, t0()));
        p.prime(&mut q, Phase::Work, 0, true);
        assert!(!p.start(&mut q, t0()));
    }

    #[test]
    fn rearm_enters_next_phase() {
        let mut q = TimerQueue::new();
        let mut p = CountdownProcess::new(ProcessId::Posture);
        p.enable(&mut q, t0(), Phase::Sitting, 1).unwrap();
        run_ticks(&mut p, &mut q, t0() + Duration::seconds(1));

        p.rearm(&mut q, t0() + Duration::seconds(5), p.phase().next(), 600)
            .unwrap();
        assert_eq!(p.phase(), Phase::Standing);
        assert_eq!(p.remaining_secs(), 600);
        assert_eq!(p.state(), ProcessState::Running);
        assert_eq!(q.armed_for(ProcessId::Posture), 1);
    }

    #[test]
    fn rearm_outside_expiry_is_rejected() {
        let mut q = TimerQueue::new();
        let mut p = CountdownProcess::new(ProcessId::Posture);
        p.enable(&mut q, t0(), Phase::Sitting, 60).unwrap();
        assert!(p.rearm(&mut q, t0(), Phase::Standing, 600).is_err());
        assert_eq!(p.phase(), Phase::Sitting);
    }

    #[test]
    fn disable_cancels_ticks_and_bumps_epoch() {
        let mut q = TimerQueue::new();
        let mut p = CountdownProcess::new(ProcessId::EyeRest);
        p.enable(&mut q, t0(), Phase::Waiting, EYE_REST_PERIOD_SECS).unwrap();
        let epoch = p.epoch();

        p.disable(&mut q);
        assert!(p.epoch() > epoch);
        assert_eq!(p.remaining_secs(), 0);
        assert!(run_ticks(&mut p, &mut q, t0() + Duration::hours(2)).is_empty());
    }

    #[test]
    fn phases_alternate() {
        assert_eq!(Phase::Work.next(), Phase::Break);
        assert_eq!(Phase::Break.next(), Phase::Work);
        assert_eq!(Phase::Sitting.next().next(), Phase::Sitting);
        assert_eq!(Phase::Waiting.next(), Phase::Waiting);
    }
}
