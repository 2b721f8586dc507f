//! Interactive session on the system clock.
//!
//! Alerts are printed to stdout and acknowledged by typing `ack <id>`
//! (clicking the alert) or `close <id>` (dismissing it). Closing an alert
//! from `ack` is reported back as a dismiss, as a desktop notification
//! center would.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use clap::Args;
use restcue_core::{
    AckPath, AlertId, AudioPlayer, Config, CoreError, DeliveryError, Event, Notifier, Orchestrator,
    Permission, SoundKey, SystemClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Longest the loop sleeps between pumps when nothing is scheduled sooner.
const MAX_WAIT: Duration = Duration::from_secs(1);

const HELP: &str = "commands: start | pause | resume | toggle | reset | drink | ack <id> | close <id> | \
status | set <key> <value> | test-notification | test-sound [main|twenty|stand] | quit";

#[derive(Args)]
pub struct RunArgs {
    /// Behave as if notification permission was refused
    #[arg(long)]
    deny_notifications: bool,
}

/// Prints alerts to stdout and queues a dismiss for every alert it closes.
struct ConsoleNotifier {
    permission: Permission,
    deny: bool,
    next: u64,
    closed: Rc<RefCell<VecDeque<AlertId>>>,
}

impl Notifier for ConsoleNotifier {
    fn request_permission(&mut self) -> Permission {
        self.permission = if self.deny {
            Permission::Denied
        } else {
            Permission::Granted
        };
        self.permission
    }

    fn permission(&self) -> Permission {
        self.permission
    }

    fn show_alert(&mut self, title: &str, body: &str, _persistent: bool) -> Result<AlertId, DeliveryError> {
        self.next += 1;
        let alert = AlertId(self.next);
        println!("[{}] {title}: {body}", alert.0);
        println!("    (ack {0} to continue, close {0} to dismiss)", alert.0);
        Ok(alert)
    }

    fn close(&mut self, alert: AlertId) -> Result<(), DeliveryError> {
        if alert.0 == 0 || alert.0 > self.next {
            return Err(DeliveryError::CloseFailed(format!("no alert {alert}")));
        }
        self.closed.borrow_mut().push_back(alert);
        Ok(())
    }
}

/// Rings the terminal bell. Stays silent until unlocked.
#[derive(Default)]
struct TerminalBell {
    unlocked: bool,
}

impl AudioPlayer for TerminalBell {
    fn unlock(&mut self) {
        self.unlocked = true;
    }

    fn play(&mut self, sound: SoundKey) -> Result<(), DeliveryError> {
        if !self.unlocked {
            return Err(DeliveryError::AudioLocked);
        }
        tracing::debug!(%sound, "ringing bell");
        let mut out = std::io::stdout();
        out.write_all(b"\x07")
            .and_then(|()| out.flush())
            .map_err(|e| DeliveryError::SoundFailed {
                sound,
                message: e.to_string(),
            })
    }
}

enum Flow {
    Continue,
    Quit,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let closed = Rc::new(RefCell::new(VecDeque::new()));
    let notifier = ConsoleNotifier {
        permission: Permission::Default,
        deny: args.deny_notifications,
        next: 0,
        closed: Rc::clone(&closed),
    };
    let mut app = Orchestrator::new(
        config,
        Box::new(SystemClock),
        Box::new(notifier),
        Box::new(TerminalBell::default()),
    );

    // Starting the session is the user gesture that asks for permission.
    match app.request_permission() {
        Ok(()) | Err(CoreError::PermissionDenied) => {}
        Err(e) => return Err(e.into()),
    }
    println!("{HELP}");
    report(app.drain_events());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(session(&mut app, &closed))
}

async fn session(
    app: &mut Orchestrator,
    closed: &RefCell<VecDeque<AlertId>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let wait = until_next_wakeup(app);
        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                app.pump();
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::debug!("stdin closed");
                    break;
                };
                if let Flow::Quit = handle(app, line.trim()) {
                    break;
                }
            }
        }

        let dismissed: Vec<AlertId> = closed.borrow_mut().drain(..).collect();
        for alert in dismissed {
            app.acknowledge(alert, AckPath::Dismiss);
        }
        report(app.drain_events());
    }
    Ok(())
}

/// Time until the orchestrator's next scheduled callback, capped at `MAX_WAIT`.
fn until_next_wakeup(app: &Orchestrator) -> Duration {
    app.next_wakeup()
        .and_then(|due| (due - app.now()).to_std().ok())
        .map_or(MAX_WAIT, |wait| wait.min(MAX_WAIT))
}

fn parse_alert(arg: Option<&str>) -> Option<AlertId> {
    arg?.trim_start_matches('#').parse().ok().map(AlertId)
}

fn handle(app: &mut Orchestrator, line: &str) -> Flow {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Flow::Continue;
    };

    match command {
        "start" => {
            if !app.start() {
                println!("nothing to start (no profile selected, or waiting for acknowledgment)");
            }
        }
        "pause" => {
            if !app.pause() {
                println!("not running");
            }
        }
        "resume" => {
            if !app.resume() {
                println!("not paused");
            }
        }
        "toggle" => {
            app.toggle();
        }
        "reset" => app.reset_all(),
        "drink" => {
            let drank = app.drink();
            println!("hydration reset ({drank} ml)");
        }
        "ack" | "close" => {
            let path = if command == "ack" {
                AckPath::Interact
            } else {
                AckPath::Dismiss
            };
            match parse_alert(words.next()) {
                Some(alert) => {
                    if !app.acknowledge(alert, path) {
                        println!("alert {alert} is not awaiting acknowledgment");
                    }
                }
                None => println!("usage: {command} <id>"),
            }
        }
        "status" => match serde_json::to_string_pretty(&app.snapshot()) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!(error = %e, "failed to render status"),
        },
        "set" => {
            let (Some(key), Some(value)) = (words.next(), words.next()) else {
                println!("usage: set <key> <value>");
                return Flow::Continue;
            };
            if app.configure(key, value).is_ok() {
                match app.config().save() {
                    Ok(()) => println!("ok"),
                    Err(e) => println!("applied but not saved: {e}"),
                }
            }
        }
        "test-notification" => app.test_notification(),
        "test-sound" => {
            let sound = match words.next().map(str::parse::<SoundKey>).transpose() {
                Ok(sound) => sound.unwrap_or(SoundKey::Main),
                Err(e) => {
                    println!("{e}");
                    return Flow::Continue;
                }
            };
            if app.test_sound(sound).is_ok() {
                println!("played {sound}");
            }
        }
        "quit" | "exit" => return Flow::Quit,
        "help" => println!("{HELP}"),
        other => println!("unknown command '{other}'; {HELP}"),
    }
    Flow::Continue
}

/// Print the events a user needs to see. The rest go to the debug log.
fn report(events: Vec<Event>) {
    for event in events {
        match &event {
            Event::NotificationRaised {
                title,
                body,
                alert: None,
                ..
            } => println!("[-] {title}: {body} (notifications unavailable, continuing)"),
            Event::ProcessRearmed {
                process,
                phase,
                remaining_secs,
                ..
            } => println!(
                "{process}: {phase:?} for {}",
                restcue_core::timer::format_mm_ss(*remaining_secs)
            ),
            Event::PermissionAdvisory { message, .. } | Event::Reset { message, .. } => {
                println!("{message}");
            }
            Event::ConfigRejected { key, message, .. } => println!("rejected {key}: {message}"),
            Event::DeliveryFailed { message, .. } => println!("sound failed: {message}"),
            _ => {}
        }
        tracing::debug!(?event, "event");
    }
}
