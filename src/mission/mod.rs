//! Mission execution, timing and logging
//!
//! The executor is the only component that commands the vehicle. It runs a
//! [`MissionPlan`](crate::algorithms::MissionPlan) as an explicit state
//! machine, one poll tick at a time, against an injected [`Clock`] so it can
//! be exercised without real hardware or timers.

pub mod state;
pub mod clock;
pub mod mission_log;
pub mod sink;
pub mod executor;

pub use state::{EndReason, MissionState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use mission_log::{EventKind, LogRecord, MissionLog, SerializedLog};
pub use sink::{JsonFileSink, LogSink, MemorySink};
pub use executor::{ExecutionSettings, MissionExecutor, MissionOutcome, StopHandle};
