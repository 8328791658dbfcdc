//! # Tabwatch Core
//!
//! The tab-activity tracking and capture pipeline.
//!
//! ## Components
//!
//! - [`MemoryStateStore`] / [`FileStateStore`] - transactional state holders
//! - [`TimeAccumulator`] - converts foreground time into durable totals
//! - [`CaptureScheduler`] - debounces captures behind a dwell threshold
//! - [`Tracker`] - reacts to host signals and peer commands
//! - [`TrackerRuntime`] - single task that owns the tracker and drains
//!   signals, commands and timers one at a time
//!
//! All tracker work happens on the runtime task, so a transaction is never
//! interleaved with another one touching the same state.

mod accumulator;
mod clock;
mod metrics;
mod relay;
mod runtime;
mod scheduler;
mod store;
mod tracker;
mod tracker_capture;
mod tracker_lifecycle;
mod tracker_resync;

#[cfg(test)]
mod test_support;

pub use accumulator::{
    TimeAccumulator, accumulated_ms, discard_timer, flush_timer, start_timer, stop_timer,
};
pub use clock::{ManualClock, SystemClock, TokioClock};
pub use metrics::{DeliveryMetrics, DeliveryStats};
pub use relay::PeerRelay;
pub use runtime::{RuntimeSettings, RuntimeStopped, TrackerControl, TrackerHandle, TrackerRuntime};
pub use scheduler::CaptureScheduler;
pub use store::{FileStateStore, MemoryStateStore, StateHandle};
pub use tracker::{Tracker, TrackerSettings, TrackerStatus};
pub use tracker_capture::{CaptureOutcome, RefreshSummary};
pub use tracker_resync::ResyncSummary;
