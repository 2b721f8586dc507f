//! Deterministic session on a manual clock, one JSON event per line.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};
use clap::Args;
use restcue_core::{
    AckPath, AlertId, AudioPlayer, Config, CoreError, DeliveryError, Event, ManualClock, Notifier,
    Orchestrator, Permission, Profile, SoundKey,
};

#[derive(Args)]
pub struct SimulateArgs {
    /// Simulated seconds to run
    #[arg(long)]
    seconds: u64,
    /// Work/break profile: short, medium, long or none
    #[arg(long, default_value = "short")]
    profile: String,
    /// Enable the 20-20-20 eye-rest reminder
    #[arg(long)]
    eye_rest: bool,
    /// Enable the sit/stand reminder
    #[arg(long)]
    posture: bool,
    /// Enable hydration hints
    #[arg(long)]
    hydration: bool,
    /// Acknowledge every alert as soon as it is shown
    #[arg(long)]
    auto_ack: bool,
    /// Behave as if notification permission was refused
    #[arg(long)]
    deny_notifications: bool,
}

#[derive(Default)]
struct Screen {
    shown: Vec<AlertId>,
    closed: Vec<AlertId>,
}

/// Records alerts instead of displaying them.
struct HeadlessNotifier {
    permission: Permission,
    answer: Permission,
    next: u64,
    screen: Rc<RefCell<Screen>>,
}

impl Notifier for HeadlessNotifier {
    fn request_permission(&mut self) -> Permission {
        self.permission = self.answer;
        self.permission
    }

    fn permission(&self) -> Permission {
        self.permission
    }

    fn show_alert(&mut self, _title: &str, _body: &str, _persistent: bool) -> Result<AlertId, DeliveryError> {
        self.next += 1;
        let alert = AlertId(self.next);
        self.screen.borrow_mut().shown.push(alert);
        Ok(alert)
    }

    fn close(&mut self, alert: AlertId) -> Result<(), DeliveryError> {
        self.screen.borrow_mut().closed.push(alert);
        Ok(())
    }
}

struct Silent;

impl AudioPlayer for Silent {
    fn unlock(&mut self) {}

    fn play(&mut self, _sound: SoundKey) -> Result<(), DeliveryError> {
        Ok(())
    }
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn config_for(args: &SimulateArgs) -> Result<Config, CoreError> {
    let mut config = Config::default();
    config.work.profile = Profile::parse_selection(&args.profile)?;
    config.eye_rest.enabled = args.eye_rest;
    config.posture.enabled = args.posture;
    config.hydration.enabled = args.hydration;
    Ok(config)
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = config_for(&args)?;
    let clock = ManualClock::new(epoch());
    let screen = Rc::new(RefCell::new(Screen::default()));
    let notifier = HeadlessNotifier {
        permission: Permission::Default,
        answer: if args.deny_notifications {
            Permission::Denied
        } else {
            Permission::Granted
        },
        next: 0,
        screen: Rc::clone(&screen),
    };
    let mut app = Orchestrator::new(config, Box::new(clock.clone()), Box::new(notifier), Box::new(Silent));

    match app.request_permission() {
        Ok(()) | Err(CoreError::PermissionDenied) => {}
        Err(e) => return Err(e.into()),
    }
    app.start();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    emit(&mut out, app.drain_events())?;

    for _ in 0..args.seconds {
        clock.advance_secs(1);
        app.pump();

        if args.auto_ack {
            let shown = std::mem::take(&mut screen.borrow_mut().shown);
            for alert in shown {
                app.acknowledge(alert, AckPath::Interact);
            }
            // The platform follows each close with a dismiss event.
            let closed = std::mem::take(&mut screen.borrow_mut().closed);
            for alert in closed {
                app.acknowledge(alert, AckPath::Dismiss);
            }
        }
        emit(&mut out, app.drain_events())?;
    }
    Ok(())
}

fn emit(out: &mut impl Write, events: Vec<Event>) -> Result<(), Box<dyn std::error::Error>> {
    for event in events {
        serde_json::to_writer(&mut *out, &event)?;
        writeln!(out)?;
    }
    Ok(())
}
