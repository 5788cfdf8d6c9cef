//! Per-repository run orchestration.
//!
//! A run moves `Dispatched -> Polling -> {Waiting, Completed, TimedOut}`; a
//! waiting run is approved once (`Approving -> Polling`) and its logs are
//! fetched whatever state the second poll reports.

mod poll;
pub mod runner;
pub mod state;

pub use poll::poll_for_run;
pub use runner::{RunOrchestrator, VerifiedRun};
pub use state::{RunPhase, RunTimeline};
