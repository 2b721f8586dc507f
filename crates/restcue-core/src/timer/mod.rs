mod clock;
mod process;
mod profile;
mod queue;

pub use clock::{Clock, ManualClock, SystemClock};
pub use process::{
    format_mm_ss, CountdownProcess, Phase, ProcessId, ProcessState, TickOutcome,
    EYE_REST_PERIOD_SECS,
};
pub use profile::Profile;
pub use queue::{Due, TimerId, TimerQueue, Wakeup};
