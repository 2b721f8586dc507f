//! Shared fakes for orchestrator scenario tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use restcue_core::{
    AlertId, AudioPlayer, Config, DeliveryError, Event, ManualClock, Notifier, Orchestrator,
    Permission, SoundKey,
};

#[derive(Debug, Clone)]
pub struct Shown {
    pub id: AlertId,
    pub title: String,
    pub body: String,
}

#[derive(Debug)]
pub struct NotifierState {
    pub permission: Permission,
    pub answer: Permission,
    pub fail_show: bool,
    pub next: u64,
    pub shown: Vec<Shown>,
    pub closed: Vec<AlertId>,
}

/// Notifier whose state stays inspectable after it is boxed into the
/// orchestrator.
#[derive(Debug, Clone)]
pub struct FakeNotifier(pub Rc<RefCell<NotifierState>>);

impl FakeNotifier {
    pub fn new(permission: Permission) -> Self {
        Self(Rc::new(RefCell::new(NotifierState {
            permission,
            answer: permission,
            fail_show: false,
            next: 0,
            shown: Vec::new(),
            closed: Vec::new(),
        })))
    }
}

impl Notifier for FakeNotifier {
    fn request_permission(&mut self) -> Permission {
        let mut state = self.0.borrow_mut();
        state.permission = state.answer;
        state.permission
    }

    fn permission(&self) -> Permission {
        self.0.borrow().permission
    }

    fn show_alert(&mut self, title: &str, body: &str, persistent: bool) -> Result<AlertId, DeliveryError> {
        assert!(persistent, "reminder alerts must be persistent");
        let mut state = self.0.borrow_mut();
        if state.fail_show {
            return Err(DeliveryError::AlertFailed("display unavailable".into()));
        }
        state.next += 1;
        let id = AlertId(state.next);
        state.shown.push(Shown {
            id,
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(id)
    }

    fn close(&mut self, alert: AlertId) -> Result<(), DeliveryError> {
        self.0.borrow_mut().closed.push(alert);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct AudioState {
    pub unlocked: bool,
    pub played: Vec<SoundKey>,
}

/// Audio that refuses to play until unlocked, like a browser before the
/// first user gesture.
#[derive(Debug, Clone, Default)]
pub struct FakeAudio(pub Rc<RefCell<AudioState>>);

impl AudioPlayer for FakeAudio {
    fn unlock(&mut self) {
        self.0.borrow_mut().unlocked = true;
    }

    fn play(&mut self, sound: SoundKey) -> Result<(), DeliveryError> {
        let mut state = self.0.borrow_mut();
        if !state.unlocked {
            return Err(DeliveryError::AudioLocked);
        }
        state.played.push(sound);
        Ok(())
    }
}

pub fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub struct Harness {
    pub clock: ManualClock,
    pub notifier: FakeNotifier,
    pub audio: FakeAudio,
    pub app: Orchestrator,
}

impl Harness {
    /// Session with permission already granted and audio unlocked.
    pub fn new(config: Config) -> Self {
        let mut h = Self::with_permission(config, Permission::Granted);
        h.app.request_permission().unwrap();
        h.app.drain_events();
        h
    }

    /// Session whose notifier answers permission requests with `permission`.
    pub fn with_permission(config: Config, permission: Permission) -> Self {
        let clock = ManualClock::new(t0());
        let notifier = FakeNotifier::new(permission);
        let audio = FakeAudio::default();
        let app = Orchestrator::new(
            config,
            Box::new(clock.clone()),
            Box::new(notifier.clone()),
            Box::new(audio.clone()),
        );
        Self {
            clock,
            notifier,
            audio,
            app,
        }
    }

    /// Advance one second at a time, pumping after each step like a live host.
    pub fn advance(&mut self, secs: i64) {
        for _ in 0..secs {
            self.clock.advance_secs(1);
            self.app.pump();
        }
    }

    /// Advance in one jump, as after the host slept, then pump once.
    pub fn jump(&mut self, secs: i64) -> usize {
        self.clock.advance_secs(secs);
        self.app.pump()
    }

    pub fn shown(&self) -> Vec<Shown> {
        self.notifier.0.borrow().shown.clone()
    }

    pub fn shown_titled(&self, title: &str) -> Vec<Shown> {
        self.shown().into_iter().filter(|s| s.title == title).collect()
    }

    pub fn last_shown(&self) -> Shown {
        self.shown().last().cloned().expect("no alert shown")
    }

    pub fn closed(&self) -> Vec<AlertId> {
        self.notifier.0.borrow().closed.clone()
    }

    pub fn played(&self) -> Vec<SoundKey> {
        self.audio.0.borrow().played.clone()
    }

    pub fn events(&mut self) -> Vec<Event> {
        self.app.drain_events()
    }
}

pub fn config_with(change: impl FnOnce(&mut Config)) -> Config {
    let mut config = Config::default();
    change(&mut config);
    config
}
