//! Integration tests for the eye-rest and posture reminders.

mod common;

use common::{config_with, Harness};
use restcue_core::{AckPath, ConfigError, Event, Phase, ProcessId, ProcessState};

fn posture_config() -> restcue_core::Config {
    config_with(|c| {
        c.posture.enabled = true;
        c.posture.sit_minutes = 30;
        c.posture.stand_minutes = 10;
    })
}

#[test]
fn eye_rest_fires_every_twenty_minutes_after_acknowledgment() {
    let mut h = Harness::new(config_with(|c| c.eye_rest.enabled = true));

    h.advance(1199);
    assert!(h.shown().is_empty());
    h.advance(1);
    let alert = h.last_shown();
    assert_eq!(alert.title, "20-20-20 Rule");
    assert_eq!(alert.body, "Look at something 20 feet away for 20 seconds.");

    // The next period only starts once the user acknowledges.
    h.advance(600);
    h.app.acknowledge(alert.id, AckPath::Interact);
    let eye = h.app.process(ProcessId::EyeRest);
    assert_eq!(eye.phase(), Phase::Waiting);
    assert_eq!(eye.remaining_secs(), 1200);

    h.advance(1200);
    assert_eq!(h.shown_titled("20-20-20 Rule").len(), 2);
}

#[test]
fn posture_acknowledgment_switches_to_standing() {
    let mut h = Harness::new(posture_config());
    h.advance(1800);

    let alert = h.last_shown();
    assert_eq!(alert.title, "Time to Stand!");
    assert_eq!(alert.body, "Time to stand for 10 minutes.");

    assert!(h.app.acknowledge(alert.id, AckPath::Dismiss));
    let posture = h.app.process(ProcessId::Posture);
    assert_eq!(posture.remaining_secs(), 600);
    assert_eq!(posture.phase(), Phase::Standing);
    assert_eq!(posture.state(), ProcessState::Running);

    h.advance(600);
    let sit = h.last_shown();
    assert_eq!(sit.title, "Time to Sit");
    assert_eq!(sit.body, "Time to sit for 30 minutes.");
}

#[test]
fn duration_change_waits_for_next_rearm() {
    let mut h = Harness::new(posture_config());
    h.advance(600);

    assert_eq!(h.app.set_stand_minutes("15").unwrap(), 15);
    assert_eq!(h.app.set_sit_minutes("45").unwrap(), 45);
    // The running sitting phase keeps its original length.
    assert_eq!(h.app.process(ProcessId::Posture).remaining_secs(), 1200);

    h.advance(1200);
    let alert = h.last_shown();
    assert_eq!(alert.body, "Time to stand for 15 minutes.");

    // Changed again while suspended: the resume reads the newest value.
    h.app.set_stand_minutes("20").unwrap();
    h.app.acknowledge(alert.id, AckPath::Interact);
    assert_eq!(h.app.process(ProcessId::Posture).remaining_secs(), 20 * 60);
}

#[test]
fn invalid_duration_input_keeps_last_valid_value() {
    let mut h = Harness::new(posture_config());

    for bad in ["abc", "0", "-10", ""] {
        let err = h.app.set_sit_minutes(bad).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }), "{bad:?}: {err}");
    }
    assert_eq!(h.app.config().posture.sit_minutes, 30);
    assert!(h.app.set_hydration_rate("NaN").is_err());
    assert_eq!(h.app.config().hydration.ml_per_hour, 500);

    let rejected = h
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::ConfigRejected { .. }))
        .count();
    assert_eq!(rejected, 5);

    // The schedule was never touched.
    h.advance(1800);
    assert_eq!(h.last_shown().title, "Time to Stand!");
}

#[test]
fn posture_always_starts_sitting_when_enabled() {
    let mut h = Harness::new(posture_config());
    h.advance(1800);
    let alert = h.last_shown();
    h.app.acknowledge(alert.id, AckPath::Interact);
    assert_eq!(h.app.process(ProcessId::Posture).phase(), Phase::Standing);

    h.app.set_posture_enabled(false);
    h.app.set_posture_enabled(true);
    let posture = h.app.process(ProcessId::Posture);
    assert_eq!(posture.phase(), Phase::Sitting);
    assert_eq!(posture.remaining_secs(), 1800);
}

#[test]
fn disabling_cancels_pending_ticks() {
    let mut h = Harness::new(config_with(|c| c.eye_rest.enabled = true));
    h.advance(600);

    h.app.set_eye_rest_enabled(false);
    assert_eq!(h.app.armed_for(ProcessId::EyeRest), 0);
    let eye = h.app.process(ProcessId::EyeRest);
    assert_eq!(eye.state(), ProcessState::Idle);
    assert_eq!(eye.remaining_secs(), 0);

    h.advance(3 * 3600);
    assert!(h.shown().is_empty());
}

#[test]
fn disabling_while_alert_is_showing_makes_acknowledgment_a_no_op() {
    let mut h = Harness::new(config_with(|c| c.eye_rest.enabled = true));
    h.advance(1200);
    let alert = h.last_shown();

    h.app.set_eye_rest_enabled(false);
    // The alert itself is left on screen.
    assert!(h.closed().is_empty());
    assert_eq!(h.app.pending_alert(ProcessId::EyeRest), None);

    assert!(!h.app.acknowledge(alert.id, AckPath::Interact));
    assert_eq!(h.app.process(ProcessId::EyeRest).state(), ProcessState::Idle);
    assert_eq!(h.app.armed_for(ProcessId::EyeRest), 0);
}

#[test]
fn stale_alert_cannot_rearm_a_re_enabled_process() {
    let mut h = Harness::new(config_with(|c| c.eye_rest.enabled = true));
    h.advance(1200);
    let old = h.last_shown();

    h.app.set_eye_rest_enabled(false);
    h.app.set_eye_rest_enabled(true);
    h.advance(100);
    assert_eq!(h.app.process(ProcessId::EyeRest).remaining_secs(), 1100);

    assert!(!h.app.acknowledge(old.id, AckPath::Dismiss));
    assert_eq!(h.app.process(ProcessId::EyeRest).remaining_secs(), 1100);
    assert_eq!(h.app.armed_for(ProcessId::EyeRest), 1);
}

#[test]
fn at_most_one_outstanding_request_per_process() {
    let mut h = Harness::new(config_with(|c| {
        c.eye_rest.enabled = true;
        c.posture.enabled = true;
        c.posture.sit_minutes = 20;
    }));

    h.advance(1200);
    assert_eq!(h.shown().len(), 2);
    assert!(h.app.pending_alert(ProcessId::EyeRest).is_some());
    assert!(h.app.pending_alert(ProcessId::Posture).is_some());

    h.advance(4 * 3600);
    assert_eq!(h.shown().len(), 2);
    assert_eq!(h.app.pending_alerts().len(), 2);
}

#[test]
fn host_sleep_catches_up_without_double_firing() {
    let mut h = Harness::new(config_with(|c| c.eye_rest.enabled = true));

    let fired = h.jump(2 * 3600);
    assert!(fired > 1200);
    assert_eq!(h.shown().len(), 1);
    let eye = h.app.process(ProcessId::EyeRest);
    assert!(eye.is_suspended_awaiting_ack());
    assert_eq!(h.app.armed_for(ProcessId::EyeRest), 0);
}

#[test]
fn processes_count_down_independently() {
    let mut h = Harness::new(config_with(|c| {
        c.eye_rest.enabled = true;
        c.posture.enabled = true;
    }));
    h.app.start();
    h.advance(100);
    h.app.pause();
    h.advance(100);

    assert_eq!(h.app.process(ProcessId::Work).remaining_secs(), 1400);
    assert_eq!(h.app.process(ProcessId::EyeRest).remaining_secs(), 1000);
    assert_eq!(h.app.process(ProcessId::Posture).remaining_secs(), 1600);
}
