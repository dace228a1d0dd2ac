//! Round progress: counts, recent outcomes and the final summary.
//!
//! `ProgressTracker` is owned by the aggregating side of a round and is the
//! only writer of `ProgressState`. Renderers get copies (`ProgressSnapshot`)
//! through `ProgressUpdate` messages and never see the tracker itself.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::error::ErrorKind;
use crate::repository::Repository;

use super::job::{CloneResult, JobKind};

/// Number of recent successes kept for display.
pub const RECENT_SUCCESSES: usize = 3;
/// Number of recent failures kept for display.
pub const RECENT_FAILURES: usize = 2;

/// Counters of one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Current activity, e.g. `Cloning dotfiles`.
    pub current: String,
}

impl ProgressState {
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }

    pub fn is_complete(&self) -> bool {
        self.finished() >= self.total
    }

    /// Completed fraction in [0.0, 1.0]. An empty round counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.finished() as f64 / self.total as f64).min(1.0)
    }
}

/// One finished job as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub name: String,
    pub duration: Duration,
    /// Error text; `None` for a success.
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl ItemOutcome {
    fn from_result(result: &CloneResult) -> Self {
        Self {
            name: result.repo.name.clone(),
            duration: result.duration,
            error: result.error.as_ref().map(ToString::to_string),
            error_kind: result.error_kind(),
        }
    }
}

/// Copy of the tracker handed to renderers.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub round: u32,
    pub kind: JobKind,
    pub state: ProgressState,
    pub elapsed: Duration,
    /// Oldest first.
    pub recent_successes: Vec<ItemOutcome>,
    /// Oldest first.
    pub recent_failures: Vec<ItemOutcome>,
}

/// End-of-round figures.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    pub round: u32,
    pub kind: JobKind,
    /// Jobs planned for the round.
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Planned jobs that never ran because the round was cancelled.
    pub withdrawn: usize,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl RoundSummary {
    /// Successful share of the jobs that ran, in percent.
    pub fn success_rate(&self) -> f64 {
        let ran = self.successful + self.failed;
        if ran == 0 {
            return 0.0;
        }
        self.successful as f64 * 100.0 / ran as f64
    }
}

/// Structured progress messages for any renderer.
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    RoundStarted {
        round: u32,
        max_rounds: u32,
        kind: JobKind,
        total: usize,
    },
    Changed(ProgressSnapshot),
    /// A job finished; sent once per result, in arrival order.
    Item(ItemOutcome),
    RoundFinished(RoundSummary),
    /// Another round follows after `delay`.
    Retrying {
        next_round: u32,
        remaining: usize,
        delay: Duration,
    },
}

#[derive(Debug)]
pub struct ProgressTracker {
    round: u32,
    kind: JobKind,
    state: ProgressState,
    started: Instant,
    recent_successes: VecDeque<ItemOutcome>,
    recent_failures: VecDeque<ItemOutcome>,
}

impl ProgressTracker {
    pub fn new(round: u32, kind: JobKind, total: usize) -> Self {
        Self {
            round,
            kind,
            state: ProgressState {
                total,
                current: format!("Starting {} repositories", total),
                ..ProgressState::default()
            },
            started: Instant::now(),
            recent_successes: VecDeque::with_capacity(RECENT_SUCCESSES),
            recent_failures: VecDeque::with_capacity(RECENT_FAILURES),
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn on_started(&mut self, repo: &Repository) {
        self.state.current = format!("{} {}", self.kind.verb(), repo.name);
    }

    /// Count one result. Returns the outcome for line-item reporting.
    pub fn record(&mut self, result: &CloneResult) -> ItemOutcome {
        let outcome = ItemOutcome::from_result(result);
        if result.success() {
            self.state.completed += 1;
            push_bounded(&mut self.recent_successes, outcome.clone(), RECENT_SUCCESSES);
        } else {
            self.state.failed += 1;
            push_bounded(&mut self.recent_failures, outcome.clone(), RECENT_FAILURES);
        }
        if self.state.is_complete() {
            self.state.current = "Done".to_string();
        }
        outcome
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            round: self.round,
            kind: self.kind,
            state: self.state.clone(),
            elapsed: self.started.elapsed(),
            recent_successes: self.recent_successes.iter().cloned().collect(),
            recent_failures: self.recent_failures.iter().cloned().collect(),
        }
    }

    pub fn finish(self, cancelled: bool) -> RoundSummary {
        let ProgressState {
            total,
            completed,
            failed,
            ..
        } = self.state;
        RoundSummary {
            round: self.round,
            kind: self.kind,
            total,
            successful: completed,
            failed,
            withdrawn: total.saturating_sub(completed + failed),
            elapsed: self.started.elapsed(),
            cancelled,
        }
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, cap: usize) {
    if queue.len() == cap {
        queue.pop_front();
    }
    queue.push_back(item);
}
