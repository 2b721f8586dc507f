//! Integration tests for the work/break cycle.
//!
//! Covers profile selection, user pause/resume, expiry parking and the
//! resume path through the acknowledgment gate.

mod common;

use common::{config_with, Harness};
use restcue_core::{AckPath, Config, Event, Phase, ProcessId, ProcessState, Profile};

#[test]
fn work_session_expiry_raises_one_request_and_parks() {
    let mut h = Harness::new(Config::default());
    assert!(h.app.start());

    h.advance(1500);

    let alerts = h.shown();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, "Work session over!");
    assert_eq!(alerts[0].body, "Click here to start your 5-minute break.");

    let work = h.app.process(ProcessId::Work);
    assert_eq!(work.state(), ProcessState::ExpiredAwaitingAck);
    assert_eq!(work.remaining_secs(), 0);
    assert_eq!(h.app.armed_for(ProcessId::Work), 0);

    // Parked: no ticks, no second request, however long the user takes.
    h.advance(3600);
    assert_eq!(h.shown().len(), 1);
    assert_eq!(h.app.process(ProcessId::Work).remaining_secs(), 0);
}

#[test]
fn acknowledging_work_expiry_starts_the_break() {
    let mut h = Harness::new(Config::default());
    h.app.start();
    h.advance(1500);
    let alert = h.last_shown().id;

    assert!(h.app.acknowledge(alert, AckPath::Interact));

    let work = h.app.process(ProcessId::Work);
    assert_eq!(work.phase(), Phase::Break);
    assert_eq!(work.remaining_secs(), 300);
    assert_eq!(work.state(), ProcessState::Running);

    h.advance(300);
    let last = h.last_shown();
    assert_eq!(last.title, "Break's over!");
    assert_eq!(last.body, "Click here to start your next 25-minute work session.");
}

#[test]
fn start_without_profile_is_a_no_op() {
    let mut h = Harness::new(config_with(|c| c.work.profile = None));
    assert!(!h.app.start());
    assert!(!h.app.toggle());
    assert!(!h.app.pause());

    h.advance(5000);
    assert!(h.shown().is_empty());
    assert_eq!(h.app.process(ProcessId::Work).state(), ProcessState::Idle);
    assert_eq!(h.app.snapshot().processes[0].display, "00:00");
}

#[test]
fn toggle_pauses_and_resumes_without_losing_time() {
    let mut h = Harness::new(Config::default());
    assert!(h.app.toggle());
    h.advance(10);
    assert_eq!(h.app.process(ProcessId::Work).remaining_secs(), 1490);

    assert!(h.app.toggle());
    assert_eq!(h.app.process(ProcessId::Work).state(), ProcessState::Paused);
    h.advance(120);
    assert_eq!(h.app.process(ProcessId::Work).remaining_secs(), 1490);
    assert_eq!(h.app.armed_for(ProcessId::Work), 0);

    assert!(h.app.resume());
    h.advance(1);
    assert_eq!(h.app.process(ProcessId::Work).remaining_secs(), 1489);

    let events = h.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ProcessPaused { remaining_secs: 1490, .. })));
}

#[test]
fn toggle_is_ignored_while_awaiting_acknowledgment() {
    let mut h = Harness::new(Config::default());
    h.app.start();
    h.advance(1500);

    assert!(!h.app.toggle());
    assert!(!h.app.start());
    assert_eq!(
        h.app.process(ProcessId::Work).state(),
        ProcessState::ExpiredAwaitingAck
    );
}

#[test]
fn profile_change_resets_an_unstarted_display() {
    let mut h = Harness::new(Config::default());
    assert_eq!(h.app.process(ProcessId::Work).remaining_secs(), 1500);

    h.app.select_profile(Some(Profile::Medium));
    assert_eq!(h.app.process(ProcessId::Work).remaining_secs(), 3000);
    assert_eq!(h.app.snapshot().processes[0].display, "50:00");
}

#[test]
fn profile_change_while_running_applies_at_next_phase() {
    let mut h = Harness::new(Config::default());
    h.app.start();
    h.advance(10);

    h.app.select_profile(Some(Profile::Long));
    assert_eq!(h.app.process(ProcessId::Work).remaining_secs(), 1490);

    h.advance(1490);
    let alert = h.last_shown();
    assert_eq!(alert.body, "Click here to start your 20-minute break.");

    h.app.acknowledge(alert.id, AckPath::Dismiss);
    assert_eq!(h.app.process(ProcessId::Work).remaining_secs(), 20 * 60);
}

#[test]
fn clearing_profile_stops_a_started_cycle() {
    let mut h = Harness::new(Config::default());
    h.app.start();
    h.advance(10);

    h.app.select_profile(None);
    let work = h.app.process(ProcessId::Work);
    assert_eq!(work.state(), ProcessState::Idle);
    assert!(!work.is_enabled());

    h.advance(2000);
    assert!(h.shown().is_empty());
}

#[test]
fn restarting_after_profile_returns_primes_fresh_work_phase() {
    let mut h = Harness::new(Config::default());
    h.app.start();
    h.advance(10);
    h.app.select_profile(None);
    h.app.select_profile(Some(Profile::Short));

    assert_eq!(h.app.process(ProcessId::Work).remaining_secs(), 1500);
    assert!(h.app.start());
    assert_eq!(h.app.process(ProcessId::Work).phase(), Phase::Work);
}

#[test]
fn start_emits_started_event_with_remaining_time() {
    let mut h = Harness::new(Config::default());
    h.app.start();
    let events = h.events();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::ProcessStarted {
            process: ProcessId::Work,
            phase: Phase::Work,
            remaining_secs: 1500,
            ..
        }
    )));
}
