//! Orchestrator: owns every process record and wires user controls to them.
//!
//! All three countdowns, the hydration sampler and the acknowledgment gate
//! share one [`TimerQueue`]. The host calls [`Orchestrator::pump`] on a
//! short period; each due callback is dispatched at its own due instant, so
//! a host that slept catches up in order.
//!
//! Cancellation always precedes re-arming: disabling a process, re-running
//! its setup, or a global reset first removes every callback it owns and
//! orphans its live alert, then arms whatever the current settings ask for.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{self, ConfigError, CoreError, DeliveryError};
use crate::events::Event;
use crate::hydration::{HydrationAccumulator, SAMPLE_PERIOD_MS};
use crate::notify::{
    AckPath, AcknowledgmentGate, AlertId, AudioPlayer, Continuation, NotificationRequest, Notifier,
    Permission, Presented, SoundKey,
};
use crate::storage::Config;
use crate::timer::{
    Clock, CountdownProcess, Phase, ProcessId, ProcessState, Profile, TickOutcome, TimerQueue, Wakeup,
};

pub const PERMISSION_ADVICE: &str = "Permissions are required for reminders to work. \
Please check your OS notification settings (e.g., Focus Assist on Windows or Do Not Disturb on macOS).";

pub const RESET_MESSAGE: &str = "Timers and settings have been reset.";

/// Presentation view of one process.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessView {
    pub process: ProcessId,
    pub state: ProcessState,
    pub phase: Phase,
    pub enabled: bool,
    pub remaining_secs: u64,
    /// Remaining time as `MM:SS`.
    pub display: String,
    pub pending_alert: Option<AlertId>,
}

/// Presentation view of the whole session.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub processes: Vec<ProcessView>,
    pub profile: Option<Profile>,
    pub hydration_enabled: bool,
    /// Debt rounded to the nearest millilitre.
    pub hydration_ml: u64,
    pub permission: Permission,
    pub at: DateTime<Utc>,
}

pub struct Orchestrator {
    config: Config,
    clock: Box<dyn Clock>,
    notifier: Box<dyn Notifier>,
    audio: Box<dyn AudioPlayer>,
    queue: TimerQueue,
    work: CountdownProcess,
    eye_rest: CountdownProcess,
    posture: CountdownProcess,
    hydration: HydrationAccumulator,
    gate: AcknowledgmentGate,
    events: Vec<Event>,
}

impl Orchestrator {
    /// Build the session from `config` and arm whatever it enables.
    ///
    /// The work/break cycle is primed with its profile's work length but
    /// not started.
    pub fn new(
        mut config: Config,
        clock: Box<dyn Clock>,
        notifier: Box<dyn Notifier>,
        audio: Box<dyn AudioPlayer>,
    ) -> Self {
        config.sanitize();
        let now = clock.now();
        let hydration = HydrationAccumulator::new(config.hydration.ml_per_hour, now);
        let mut orchestrator = Self {
            config,
            clock,
            notifier,
            audio,
            queue: TimerQueue::new(),
            work: CountdownProcess::new(ProcessId::Work),
            eye_rest: CountdownProcess::new(ProcessId::EyeRest),
            posture: CountdownProcess::new(ProcessId::Posture),
            hydration,
            gate: AcknowledgmentGate::new(),
            events: Vec::new(),
        };
        orchestrator.arm_hydration_sampler(now);
        orchestrator.prime_work(now);
        orchestrator.setup_background(ProcessId::EyeRest, now);
        orchestrator.setup_background(ProcessId::Posture, now);
        orchestrator
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn process(&self, id: ProcessId) -> &CountdownProcess {
        match id {
            ProcessId::Work => &self.work,
            ProcessId::EyeRest => &self.eye_rest,
            ProcessId::Posture => &self.posture,
        }
    }

    /// Live alert raised by `id`, if it is awaiting acknowledgment.
    pub fn pending_alert(&self, id: ProcessId) -> Option<AlertId> {
        self.gate.pending_for(id)
    }

    /// Every live alert, oldest first.
    pub fn pending_alerts(&self) -> Vec<AlertId> {
        self.gate.pending()
    }

    /// Number of scheduled callbacks owned by `id`.
    pub fn armed_for(&self, id: ProcessId) -> usize {
        self.queue.armed_for(id)
    }

    /// Due instant of the earliest scheduled callback.
    pub fn next_wakeup(&self) -> Option<DateTime<Utc>> {
        self.queue.next_due()
    }

    pub fn permission(&self) -> Permission {
        self.notifier.permission()
    }

    pub fn snapshot(&self) -> Snapshot {
        let processes = ProcessId::ALL
            .iter()
            .map(|&id| {
                let p = self.process(id);
                ProcessView {
                    process: id,
                    state: p.state(),
                    phase: p.phase(),
                    enabled: p.is_enabled(),
                    remaining_secs: p.remaining_secs(),
                    display: p.display(),
                    pending_alert: self.gate.pending_for(id),
                }
            })
            .collect();
        Snapshot {
            processes,
            profile: self.config.work.profile,
            hydration_enabled: self.config.hydration.enabled,
            hydration_ml: self.hydration.rounded_ml(),
            permission: self.notifier.permission(),
            at: self.clock.now(),
        }
    }

    /// Take every event produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Event loop ───────────────────────────────────────────────────

    /// Dispatch every callback due at or before the clock's current time.
    /// Returns how many fired.
    pub fn pump(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        while let Some(due) = self.queue.pop_due(now) {
            fired += 1;
            match due.wakeup {
                Wakeup::SampleHydration => {
                    self.hydration.sample(due.at);
                }
                Wakeup::Tick(id) => self.on_tick(id, due.at),
            }
        }
        fired
    }

    /// Route a user action on `alert` to the gate.
    ///
    /// Returns true if this event resolved the alert and resumed (or tried
    /// to resume) its process; false for duplicates and unknown alerts.
    pub fn acknowledge(&mut self, alert: AlertId, path: AckPath) -> bool {
        let now = self.clock.now();
        let Some(continuation) = self.gate.acknowledge(alert, path, self.notifier.as_mut()) else {
            return false;
        };
        self.events.push(Event::AlertAcknowledged {
            alert,
            process: continuation.process(),
            path,
            at: now,
        });
        self.apply(continuation, now);
        true
    }

    // ── Work/break controls ──────────────────────────────────────────

    /// Start or resume the work/break cycle. No-op without a profile.
    pub fn start(&mut self) -> bool {
        if self.config.work.profile.is_none() {
            tracing::debug!("start ignored, no profile selected");
            return false;
        }
        let now = self.clock.now();
        if self.work.state() == ProcessState::Idle && self.work.remaining_secs() == 0 {
            self.prime_work(now);
        }
        if !self.work.start(&mut self.queue, now) {
            return false;
        }
        self.events.push(Event::ProcessStarted {
            process: ProcessId::Work,
            phase: self.work.phase(),
            remaining_secs: self.work.remaining_secs(),
            at: now,
        });
        true
    }

    /// Pause a running work/break cycle. No-op without a profile.
    pub fn pause(&mut self) -> bool {
        if self.config.work.profile.is_none() || !self.work.pause(&mut self.queue) {
            return false;
        }
        self.events.push(Event::ProcessPaused {
            process: ProcessId::Work,
            remaining_secs: self.work.remaining_secs(),
            at: self.clock.now(),
        });
        true
    }

    /// Resume a paused work/break cycle. No-op unless paused.
    pub fn resume(&mut self) -> bool {
        if self.work.state() != ProcessState::Paused {
            return false;
        }
        self.start()
    }

    /// Running <-> Paused; starts an idle cycle. Does nothing while the
    /// cycle awaits acknowledgment.
    pub fn toggle(&mut self) -> bool {
        match self.work.state() {
            ProcessState::Running => self.pause(),
            ProcessState::Idle | ProcessState::Paused => self.start(),
            ProcessState::ExpiredAwaitingAck => false,
        }
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// Change the work/break profile.
    ///
    /// An unstarted cycle shows the new work length immediately; a started
    /// one picks it up at its next phase change. Clearing the profile stops
    /// a started cycle.
    pub fn select_profile(&mut self, profile: Option<Profile>) {
        self.update_config(|config| config.work.profile = profile);
    }

    pub fn set_eye_rest_enabled(&mut self, enabled: bool) {
        self.update_config(|config| config.eye_rest.enabled = enabled);
    }

    pub fn set_posture_enabled(&mut self, enabled: bool) {
        self.update_config(|config| config.posture.enabled = enabled);
    }

    pub fn set_hydration_enabled(&mut self, enabled: bool) {
        self.update_config(|config| config.hydration.enabled = enabled);
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.update_config(|config| config.notifications.sound = enabled);
    }

    /// Set the sitting length from raw user input. Keeps the last valid
    /// value on rejection.
    pub fn set_sit_minutes(&mut self, raw: &str) -> Result<u32, ConfigError> {
        self.configure("posture.sit_minutes", raw)?;
        Ok(self.config.posture.sit_minutes)
    }

    /// Set the standing length from raw user input. Keeps the last valid
    /// value on rejection.
    pub fn set_stand_minutes(&mut self, raw: &str) -> Result<u32, ConfigError> {
        self.configure("posture.stand_minutes", raw)?;
        Ok(self.config.posture.stand_minutes)
    }

    /// Set the hydration rate (ml per hour) from raw user input. Keeps the
    /// last valid value on rejection.
    pub fn set_hydration_rate(&mut self, raw: &str) -> Result<u32, ConfigError> {
        self.configure("hydration.ml_per_hour", raw)?;
        Ok(self.config.hydration.ml_per_hour)
    }

    /// Set any configuration key from raw user input, applying its side
    /// effects. Rejected input leaves the configuration untouched.
    pub fn configure(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let before = self.config.clone();
        if let Err(e) = self.config.set_value(key, raw) {
            tracing::warn!(key, value = raw, error = %e, "rejected configuration input");
            self.events.push(Event::ConfigRejected {
                key: key.to_string(),
                value: raw.to_string(),
                message: e.to_string(),
                at: self.clock.now(),
            });
            return Err(e);
        }
        self.apply_config_change(&before);
        Ok(())
    }

    // ── Global operations ────────────────────────────────────────────

    /// Ask for notification permission. Also unlocks audio, since this is
    /// always called from a user gesture.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PermissionDenied` when the user refused. Reminders
    /// keep running and acknowledge themselves.
    pub fn request_permission(&mut self) -> error::Result<()> {
        let permission = self.notifier.request_permission();
        self.audio.unlock();
        let now = self.clock.now();
        self.events.push(Event::PermissionChanged { permission, at: now });
        if permission == Permission::Granted {
            return Ok(());
        }
        if self.gate.note_permission_denied() {
            tracing::warn!(?permission, "notification permission denied");
            self.events.push(Event::PermissionAdvisory {
                message: PERMISSION_ADVICE.to_string(),
                at: now,
            });
        }
        Err(CoreError::PermissionDenied)
    }

    /// Record that the user drank: the hydration debt drops to zero and
    /// accrues again from now. Returns the debt that was cleared.
    pub fn drink(&mut self) -> u64 {
        let now = self.clock.now();
        self.hydration.sample(now);
        let drank = self.hydration.drink().round() as u64;
        tracing::info!(drank_ml = drank, "hydration debt cleared");
        self.events.push(Event::HydrationReset { drank_ml: drank, at: now });
        drank
    }

    /// Cancel everything and reinitialize from the current settings.
    ///
    /// Alerts already on screen stay there but no longer resume anything.
    pub fn reset_all(&mut self) {
        let now = self.clock.now();
        let cancelled = self.queue.clear();
        let orphaned = self.gate.orphan_all();
        tracing::info!(cancelled, orphaned, "resetting all timers");

        self.hydration.reset(now);
        self.arm_hydration_sampler(now);
        self.prime_work(now);
        self.setup_background(ProcessId::EyeRest, now);
        self.setup_background(ProcessId::Posture, now);

        self.events.push(Event::Reset {
            message: RESET_MESSAGE.to_string(),
            at: now,
        });
    }

    /// Show a test alert whose acknowledgment resumes nothing.
    pub fn test_notification(&mut self) {
        let request = NotificationRequest::new(
            "Test Notification",
            "If you see this, notifications are working!",
            "",
            SoundKey::Main,
            Continuation::Noop,
        );
        let now = self.clock.now();
        self.present(request, now);
    }

    /// Play `sound` directly.
    ///
    /// # Errors
    ///
    /// Returns the playback error so the caller can tell the user.
    pub fn test_sound(&mut self, sound: SoundKey) -> Result<(), DeliveryError> {
        self.audio.play(sound).map_err(|e| {
            tracing::error!(error = %e, %sound, "test sound failed");
            self.events.push(Event::DeliveryFailed {
                message: e.to_string(),
                at: self.clock.now(),
            });
            e
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn process_and_queue(&mut self, id: ProcessId) -> (&mut CountdownProcess, &mut TimerQueue) {
        let process = match id {
            ProcessId::Work => &mut self.work,
            ProcessId::EyeRest => &mut self.eye_rest,
            ProcessId::Posture => &mut self.posture,
        };
        (process, &mut self.queue)
    }

    fn flag_enabled(&self, id: ProcessId) -> bool {
        match id {
            ProcessId::Work => self.config.work.profile.is_some(),
            ProcessId::EyeRest => self.config.eye_rest.enabled,
            ProcessId::Posture => self.config.posture.enabled,
        }
    }

    fn update_config(&mut self, change: impl FnOnce(&mut Config)) {
        let before = self.config.clone();
        change(&mut self.config);
        self.apply_config_change(&before);
    }

    fn apply_config_change(&mut self, before: &Config) {
        let now = self.clock.now();

        if before.work.profile != self.config.work.profile {
            self.events.push(Event::ProfileChanged {
                profile: self.config.work.profile,
                at: now,
            });
            if self.work.state() == ProcessState::Idle {
                self.prime_work(now);
            } else if self.config.work.profile.is_none() {
                self.disable(ProcessId::Work, now);
            }
        }
        if before.eye_rest.enabled != self.config.eye_rest.enabled {
            self.setup_background(ProcessId::EyeRest, now);
        }
        if before.posture.enabled != self.config.posture.enabled {
            self.setup_background(ProcessId::Posture, now);
        }
        if before.hydration.ml_per_hour != self.config.hydration.ml_per_hour {
            // Accrue at the old rate up to now before switching.
            self.hydration.sample(now);
            if let Err(e) = self.hydration.set_rate(self.config.hydration.ml_per_hour) {
                tracing::warn!(error = %e, "hydration rate not applied");
            }
        }
        if !before.hydration.enabled && self.config.hydration.enabled {
            self.hydration.reset(now);
        }
    }

    fn arm_hydration_sampler(&mut self, now: DateTime<Utc>) {
        self.queue
            .cancel_matching(|wakeup| *wakeup == Wakeup::SampleHydration);
        self.queue.set_interval(
            now,
            Duration::milliseconds(SAMPLE_PERIOD_MS),
            Wakeup::SampleHydration,
        );
    }

    /// Put the work/break cycle back to an unstarted Work phase.
    fn prime_work(&mut self, at: DateTime<Utc>) {
        self.gate.orphan(ProcessId::Work);
        let profile = self.config.work.profile;
        let secs = profile.map(Profile::work_secs).unwrap_or(0);
        self.work
            .prime(&mut self.queue, Phase::Work, secs, profile.is_some());
        self.events.push(Event::ProcessPrimed {
            process: ProcessId::Work,
            phase: Phase::Work,
            remaining_secs: secs,
            at,
        });
    }

    /// (Re)start a background reminder from its current settings, or stop
    /// it if its flag is cleared.
    fn setup_background(&mut self, id: ProcessId, at: DateTime<Utc>) {
        let wanted = self.flag_enabled(id);
        let phase = id.initial_phase();
        let secs = self.config.phase_secs(phase).unwrap_or(0);
        let was_enabled = self.process(id).is_enabled();

        self.gate.orphan(id);
        let (process, queue) = self.process_and_queue(id);
        process.disable(queue);
        if !wanted {
            if was_enabled {
                self.events.push(Event::ProcessDisabled { process: id, at });
            }
            return;
        }

        match process.enable(queue, at, phase, secs) {
            Ok(()) => self.events.push(Event::ProcessStarted {
                process: id,
                phase,
                remaining_secs: secs,
                at,
            }),
            Err(e) => {
                tracing::warn!(process = %id, error = %e, "reminder not started");
                self.events.push(Event::ConfigRejected {
                    key: id.as_str().to_string(),
                    value: secs.to_string(),
                    message: e.to_string(),
                    at,
                });
            }
        }
    }

    fn disable(&mut self, id: ProcessId, at: DateTime<Utc>) {
        self.gate.orphan(id);
        let (process, queue) = self.process_and_queue(id);
        process.disable(queue);
        self.events.push(Event::ProcessDisabled { process: id, at });
    }

    fn on_tick(&mut self, id: ProcessId, at: DateTime<Utc>) {
        let (process, queue) = self.process_and_queue(id);
        if process.tick(queue) != TickOutcome::Expired {
            return;
        }

        let phase = self.process(id).phase();
        let epoch = self.process(id).epoch();
        self.events.push(Event::ProcessExpired {
            process: id,
            phase,
            at,
        });

        let hint = self.hydration_hint(at);
        let request = self.expiry_request(id, phase.next(), epoch, &hint);
        self.present(request, at);
    }

    fn hydration_hint(&mut self, at: DateTime<Utc>) -> String {
        if !self.config.hydration.enabled {
            return String::new();
        }
        self.hydration.hint_at(at)
    }

    /// Notification for a process that just expired and will enter `next_phase`.
    fn expiry_request(&self, id: ProcessId, next_phase: Phase, epoch: u64, hint: &str) -> NotificationRequest {
        let minutes = |phase: Phase| self.config.phase_secs(phase).unwrap_or(0) / 60;
        let (title, body) = match next_phase {
            Phase::Break => (
                "Work session over!",
                format!("Click here to start your {}-minute break.", minutes(Phase::Break)),
            ),
            Phase::Work => (
                "Break's over!",
                format!(
                    "Click here to start your next {}-minute work session.",
                    minutes(Phase::Work)
                ),
            ),
            Phase::Waiting => (
                "20-20-20 Rule",
                "Look at something 20 feet away for 20 seconds.".to_string(),
            ),
            Phase::Standing => (
                "Time to Stand!",
                format!("Time to stand for {} minutes.", minutes(Phase::Standing)),
            ),
            Phase::Sitting => (
                "Time to Sit",
                format!("Time to sit for {} minutes.", minutes(Phase::Sitting)),
            ),
        };
        NotificationRequest::new(
            title,
            body,
            hint,
            id.sound(),
            Continuation::Resume {
                process: id,
                epoch,
                next_phase,
            },
        )
    }

    fn present(&mut self, request: NotificationRequest, at: DateTime<Utc>) {
        let process = request.origin();
        let title = request.title.clone();
        let body = request.body.clone();
        let sound = request.sound;

        let presented = self.gate.present(
            request,
            self.notifier.as_mut(),
            self.audio.as_mut(),
            self.config.notifications.sound,
        );
        let alert = match presented {
            Presented::Shown(alert) => Some(alert),
            Presented::Resolved(_) => None,
        };
        self.events.push(Event::NotificationRaised {
            process,
            title,
            body,
            sound,
            alert,
            at,
        });
        if let Presented::Resolved(continuation) = presented {
            self.apply(continuation, at);
        }
    }

    /// Run an acknowledged continuation.
    ///
    /// The next phase's length is read from the configuration now, not
    /// when the alert was raised.
    fn apply(&mut self, continuation: Continuation, at: DateTime<Utc>) {
        let Continuation::Resume {
            process: id,
            epoch,
            next_phase,
        } = continuation
        else {
            return;
        };

        let current = self.process(id);
        if !current.is_enabled() || current.epoch() != epoch || !current.is_suspended_awaiting_ack() {
            tracing::debug!(process = %id, "acknowledgment for a disabled or reset process ignored");
            self.events.push(Event::StaleAcknowledgment { process: id, at });
            return;
        }

        let Some(secs) = self.config.phase_secs(next_phase) else {
            tracing::warn!(process = %id, ?next_phase, "next phase has no duration, stopping process");
            self.disable(id, at);
            return;
        };

        let (process, queue) = self.process_and_queue(id);
        match process.rearm(queue, at, next_phase, secs) {
            Ok(()) => self.events.push(Event::ProcessRearmed {
                process: id,
                phase: next_phase,
                remaining_secs: secs,
                at,
            }),
            Err(e) => tracing::warn!(process = %id, error = %e, "process not re-armed"),
        }
    }
}
