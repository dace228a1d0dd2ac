//! Clone scheduler.
//!
//! Coordinates one or more rounds per account:
//! manager → job queue → worker pool → clone executor → result stream → progress tracker.
//! The manager owns the pool and tracker for the lifetime of a round and
//! decides, through the retry oracle, whether another round follows.

mod job;
mod manager;
mod pool;
mod progress;

pub use job::{CloneJob, CloneResult, JobKind, WorkerEvent};
pub use manager::{
    CloneReport, Manager, ManagerSettings, RoundPhase, RoundReport, UpdateReport,
};
pub use pool::{SubmitError, WorkerPool};
pub use progress::{
    ItemOutcome, ProgressSnapshot, ProgressState, ProgressTracker, ProgressUpdate, RoundSummary,
    RECENT_FAILURES, RECENT_SUCCESSES,
};
