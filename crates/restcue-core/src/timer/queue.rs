//! Delayed and repeating callback scheduling.
//!
//! The queue never calls anything by itself. The owner pumps it with the
//! current instant and dispatches each [`Wakeup`] it pops, one at a time and
//! in due order, so all mutation happens inside a single callback turn.
//!
//! ```text
//! set_timeout / set_interval -> (due, id) -> pop_due(now) -> dispatch
//!                                   ^                            |
//!                                   +---- interval re-insert ----+
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::process::ProcessId;

/// Handle for a scheduled callback. Ids grow monotonically, which also
/// orders callbacks that share a due instant by arming order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(u64);

/// What a fired callback asks the owner to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "process", rename_all = "snake_case")]
pub enum Wakeup {
    /// Per-second countdown tick of a process.
    Tick(ProcessId),
    /// Periodic hydration sampling.
    SampleHydration,
}

impl Wakeup {
    /// The process this callback belongs to, if any.
    pub fn owner(&self) -> Option<ProcessId> {
        match self {
            Wakeup::Tick(id) => Some(*id),
            Wakeup::SampleHydration => None,
        }
    }
}

/// A callback popped from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Due {
    pub id: TimerId,
    pub at: DateTime<Utc>,
    pub wakeup: Wakeup,
}

#[derive(Debug, Clone)]
struct Entry {
    wakeup: Wakeup,
    period: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    entries: BTreeMap<(DateTime<Utc>, TimerId), Entry>,
    due_at: HashMap<TimerId, DateTime<Utc>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `wakeup` once, `delay` after `now`.
    pub fn set_timeout(&mut self, now: DateTime<Utc>, delay: Duration, wakeup: Wakeup) -> TimerId {
        self.insert(now + delay, wakeup, None)
    }

    /// Fire `wakeup` every `period`, first at `now + period`.
    ///
    /// Periods shorter than a millisecond are raised to one millisecond so a
    /// pump can never spin on the same instant.
    pub fn set_interval(&mut self, now: DateTime<Utc>, period: Duration, wakeup: Wakeup) -> TimerId {
        let period = period.max(Duration::milliseconds(1));
        self.insert(now + period, wakeup, Some(period))
    }

    /// Cancel one callback. Returns false if it was not armed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.due_at.remove(&id) {
            Some(at) => {
                self.entries.remove(&(at, id));
                tracing::debug!(?id, "cancelled timer");
                true
            }
            None => false,
        }
    }

    /// Cancel every callback whose wakeup matches. Returns how many were removed.
    pub fn cancel_matching(&mut self, mut pred: impl FnMut(&Wakeup) -> bool) -> usize {
        let doomed: Vec<(DateTime<Utc>, TimerId)> = self
            .entries
            .iter()
            .filter(|(_, entry)| pred(&entry.wakeup))
            .map(|(key, _)| *key)
            .collect();
        for key in &doomed {
            self.entries.remove(key);
            self.due_at.remove(&key.1);
        }
        doomed.len()
    }

    /// Cancel every callback owned by `process`.
    pub fn cancel_owned_by(&mut self, process: ProcessId) -> usize {
        self.cancel_matching(|wakeup| wakeup.owner() == Some(process))
    }

    /// Cancel everything.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        self.due_at.clear();
        n
    }

    /// Pop the earliest callback due at or before `now`.
    ///
    /// Interval callbacks are re-inserted one period after their own due
    /// instant, so a late pump catches up on every missed occurrence.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<Due> {
        let (&(at, id), _) = self.entries.iter().next()?;
        if at > now {
            return None;
        }
        let entry = self.entries.remove(&(at, id))?;
        self.due_at.remove(&id);

        if let Some(period) = entry.period {
            let next = at + period;
            self.entries.insert((next, id), entry.clone());
            self.due_at.insert(id, next);
        }

        Some(Due {
            id,
            at,
            wakeup: entry.wakeup,
        })
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.entries.keys().next().map(|(at, _)| *at)
    }

    /// Number of armed callbacks owned by `process`.
    pub fn armed_for(&self, process: ProcessId) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.wakeup.owner() == Some(process))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, at: DateTime<Utc>, wakeup: Wakeup, period: Option<Duration>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert((at, id), Entry { wakeup, period });
        self.due_at.insert(id, at);
        tracing::debug!(?id, ?wakeup, %at, "armed timer");
        id
    }
}
