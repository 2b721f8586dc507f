//! Acknowledgment Gate.
//!
//! Presents a [`NotificationRequest`] and hands its continuation back exactly
//! once, whichever of the two resolution paths fires first:
//!
//! - **Interact**: the user clicked the alert. The gate closes it, which on
//!   most platforms raises a dismiss event right after.
//! - **Dismiss**: the alert was closed, by the user or by the gate itself.
//!
//! The gate only tracks alerts that still await acknowledgment. Resolving an
//! alert removes its entry, so removal is the consumed flag: the second event
//! of an interact-then-close pair finds nothing left to resume, and a
//! platform that never reports the close leaves nothing behind.
//!
//! Without notification permission the gate fails open and returns the
//! continuation immediately, since no user action could ever arrive.

use std::collections::BTreeMap;

use super::{AckPath, AlertId, AudioPlayer, Continuation, NotificationRequest, Notifier, Permission};
use crate::timer::ProcessId;

/// Outcome of presenting a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presented {
    /// The alert is on screen; the continuation waits for a user action.
    Shown(AlertId),
    /// The alert could not be shown; apply the continuation now.
    Resolved(Continuation),
}

#[derive(Debug, Clone)]
struct PendingAlert {
    origin: Option<ProcessId>,
    title: String,
    continuation: Continuation,
}

#[derive(Debug, Default)]
pub struct AcknowledgmentGate {
    alerts: BTreeMap<AlertId, PendingAlert>,
    advised_denied: bool,
}

impl AcknowledgmentGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `request` and play its sound.
    pub fn present(
        &mut self,
        request: NotificationRequest,
        notifier: &mut dyn Notifier,
        audio: &mut dyn AudioPlayer,
        play_sound: bool,
    ) -> Presented {
        let permission = notifier.permission();
        if permission != Permission::Granted {
            tracing::warn!(?permission, title = %request.title, "notification permission not granted, acknowledging immediately");
            return Presented::Resolved(request.on_acknowledge);
        }

        let origin = request.origin();
        if let Some(process) = origin {
            // One live alert per process: a newer request supersedes.
            let superseded = self.orphan(process);
            if superseded > 0 {
                tracing::warn!(%process, superseded, "superseded an unacknowledged alert");
            }
        }

        let alert = match notifier.show_alert(&request.title, &request.body, true) {
            Ok(alert) => alert,
            Err(e) => {
                tracing::error!(error = %e, title = %request.title, "failed to show alert, acknowledging immediately");
                return Presented::Resolved(request.on_acknowledge);
            }
        };

        if play_sound {
            if let Err(e) = audio.play(request.sound) {
                tracing::error!(error = %e, sound = %request.sound, "failed to play notification sound");
            }
        }

        tracing::debug!(%alert, title = %request.title, "alert shown");
        self.alerts.insert(
            alert,
            PendingAlert {
                origin,
                title: request.title,
                continuation: request.on_acknowledge,
            },
        );
        Presented::Shown(alert)
    }

    /// Resolve `alert` through `path`.
    ///
    /// Returns the continuation the first time an alert is resolved and
    /// `None` for every later event, unknown alerts and orphaned alerts.
    /// An interaction always closes the alert, even one that no longer
    /// resumes anything.
    pub fn acknowledge(&mut self, alert: AlertId, path: AckPath, notifier: &mut dyn Notifier) -> Option<Continuation> {
        let pending = self.alerts.remove(&alert);
        match &pending {
            Some(p) => tracing::debug!(%alert, ?path, title = %p.title, "alert acknowledged"),
            None => tracing::debug!(%alert, ?path, "event for resolved or unknown alert ignored"),
        }

        if path == AckPath::Interact {
            if let Err(e) = notifier.close(alert) {
                tracing::error!(error = %e, %alert, "failed to close alert");
            }
        }
        pending.map(|p| p.continuation)
    }

    /// Forget every live alert raised by `process` without invoking its
    /// continuation. The alerts stay on screen; acknowledging them later
    /// does nothing. Returns how many were orphaned.
    pub fn orphan(&mut self, process: ProcessId) -> usize {
        let before = self.alerts.len();
        self.alerts.retain(|_, pending| pending.origin != Some(process));
        before - self.alerts.len()
    }

    /// Orphan every live alert.
    pub fn orphan_all(&mut self) -> usize {
        let n = self.alerts.len();
        self.alerts.clear();
        n
    }

    /// The live alert raised by `process`, if any.
    pub fn pending_for(&self, process: ProcessId) -> Option<AlertId> {
        self.alerts
            .iter()
            .find(|(_, pending)| pending.origin == Some(process))
            .map(|(alert, _)| *alert)
    }

    /// Every live alert, oldest first.
    pub fn pending(&self) -> Vec<AlertId> {
        self.alerts.keys().copied().collect()
    }

    pub fn is_pending(&self, alert: AlertId) -> bool {
        self.alerts.contains_key(&alert)
    }

    /// Number of alerts still awaiting acknowledgment.
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Record a permission denial. True only the first time, so the
    /// advisory is shown once.
    pub fn note_permission_denied(&mut self) -> bool {
        !std::mem::replace(&mut self.advised_denied, true)
    }
}
