//! Round orchestration: target directory, pool lifetime, submission,
//! aggregation and the retry loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::MgcConfig;
use crate::control::CancelToken;
use crate::error::PreconditionError;
use crate::git::{self, CloneExecutor, CloneTool};
use crate::repository::{safe_dir_name, Repository};
use crate::retry::{self, RetryDecision, RoundPolicy};

use super::job::{CloneJob, CloneResult, JobKind, WorkerEvent};
use super::pool::WorkerPool;
use super::progress::{ProgressTracker, ProgressUpdate, RoundSummary};

/// Lifecycle of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    DirectoryPrepared,
    PoolRunning,
    Draining,
    Finished,
}

/// Knobs the manager needs, usually taken from `MgcConfig`.
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub max_concurrency: usize,
    pub clone_timeout: Duration,
    pub base_dir: PathBuf,
    pub policy: RoundPolicy,
}

impl ManagerSettings {
    pub fn from_config(cfg: &MgcConfig) -> Self {
        Self {
            max_concurrency: cfg.max_concurrency.max(1),
            clone_timeout: cfg.clone_timeout(),
            base_dir: cfg.base_dir.clone(),
            policy: RoundPolicy::from_config(cfg),
        }
    }
}

/// Everything one round produced.
#[derive(Debug)]
pub struct RoundReport {
    /// Repositories a worker actually ran, in submission order. One result
    /// each.
    pub submitted: Vec<Arc<Repository>>,
    /// One per claimed job, in arrival order.
    pub results: Vec<CloneResult>,
    /// Planned repositories that never ran because the round was cancelled,
    /// in selection order.
    pub withdrawn: Vec<Arc<Repository>>,
    pub summary: RoundSummary,
}

impl RoundReport {
    pub fn failures(&self) -> impl Iterator<Item = &CloneResult> {
        self.results.iter().filter(|r| !r.success())
    }
}

/// Outcome of `clone_with_retry`.
#[derive(Debug)]
pub struct CloneReport {
    pub target_dir: PathBuf,
    /// Repositories selected for cloning.
    pub selected: usize,
    pub rounds: Vec<RoundReport>,
    /// Selected repositories without a valid clone after the last round.
    pub still_failed: Vec<Arc<Repository>>,
    pub cancelled: bool,
}

impl CloneReport {
    pub fn successful(&self) -> usize {
        self.selected.saturating_sub(self.still_failed.len())
    }
}

/// Outcome of `update_repositories`.
#[derive(Debug)]
pub struct UpdateReport {
    pub target_dir: PathBuf,
    pub round: RoundReport,
    /// Requested repositories with no local clone; not submitted.
    pub skipped: Vec<Arc<Repository>>,
}

/// Coordinates rounds for one account directory.
pub struct Manager<T: CloneTool> {
    executor: Arc<CloneExecutor<T>>,
    settings: ManagerSettings,
    phase: RoundPhase,
}

impl<T: CloneTool> Manager<T> {
    pub fn new(tool: T, settings: ManagerSettings) -> Self {
        Self {
            executor: Arc::new(CloneExecutor::new(tool, settings.clone_timeout)),
            settings,
            phase: RoundPhase::Idle,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    /// `<base_dir>/<account>`, without touching the filesystem.
    pub fn target_dir(&self, account: &str) -> PathBuf {
        self.settings.base_dir.join(safe_dir_name(account))
    }

    /// Check the clone tool and create the account directory.
    pub async fn prepare_target_dir(&mut self, account: &str) -> Result<PathBuf, PreconditionError> {
        let version = self
            .executor
            .tool()
            .check_available()
            .await
            .map_err(|e| PreconditionError::ToolUnavailable(e.message))?;
        tracing::debug!(%version, "clone tool available");

        let target = self.target_dir(account);
        tokio::fs::create_dir_all(&target)
            .await
            .map_err(|source| PreconditionError::TargetDir {
                path: target.clone(),
                source,
            })?;
        self.phase = RoundPhase::DirectoryPrepared;
        tracing::info!(path = %target.display(), "target directory ready");
        Ok(target)
    }

    /// Run one round: start the pool, submit `jobs` in order while aggregating
    /// results, then stop the pool.
    ///
    /// Submission stops early once `cancel` is raised; the jobs already
    /// claimed still report, queued ones are withdrawn. Aggregation ends when the result stream closes,
    /// which happens only after every worker has exited.
    pub async fn run_round(
        &mut self,
        round: u32,
        jobs: Vec<CloneJob>,
        kind: JobKind,
        cancel: &CancelToken,
        progress: Option<&mpsc::Sender<ProgressUpdate>>,
    ) -> RoundReport {
        let total = jobs.len();
        tracing::info!(round, total, ?kind, "round started");
        emit(
            progress,
            ProgressUpdate::RoundStarted {
                round,
                max_rounds: self.max_rounds(kind),
                kind,
                total,
            },
        )
        .await;

        let (mut pool, mut events) = WorkerPool::start(
            Arc::clone(&self.executor),
            self.settings.max_concurrency,
            cancel.clone(),
        );
        self.phase = RoundPhase::PoolRunning;
        let phase = &mut self.phase;

        let submit = async {
            let mut queued = Vec::with_capacity(total);
            let mut unsent = Vec::new();
            let mut jobs = jobs.into_iter();
            for job in jobs.by_ref() {
                if cancel.is_cancelled() {
                    unsent.push(job.repo);
                    break;
                }
                let repo = Arc::clone(&job.repo);
                if let Err(e) = pool.submit(job).await {
                    tracing::info!(round, repo = %repo.name, "submission stopped: {}", e);
                    unsent.push(repo);
                    break;
                }
                queued.push(repo);
            }
            unsent.extend(jobs.map(|job| job.repo));
            pool.close();
            *phase = RoundPhase::Draining;
            (queued, unsent)
        };

        let aggregate = async {
            let mut tracker = ProgressTracker::new(round, kind, total);
            let mut results = Vec::with_capacity(total);
            while let Some(event) = events.recv().await {
                match event {
                    WorkerEvent::Started { repo, .. } => tracker.on_started(&repo),
                    WorkerEvent::Finished(result) => {
                        let item = tracker.record(&result);
                        results.push(result);
                        emit(progress, ProgressUpdate::Item(item)).await;
                    }
                }
                emit(progress, ProgressUpdate::Changed(tracker.snapshot())).await;
            }
            (tracker, results)
        };

        let ((queued, unsent), (tracker, results)) = tokio::join!(submit, aggregate);
        let mut withdrawn: Vec<Arc<Repository>> =
            pool.join().await.into_iter().map(|job| job.repo).collect();
        let submitted: Vec<Arc<Repository>> = queued
            .into_iter()
            .filter(|repo| !withdrawn.iter().any(|w| Arc::ptr_eq(w, repo)))
            .collect();
        withdrawn.extend(unsent);

        let summary = tracker.finish(cancel.is_cancelled());
        self.phase = RoundPhase::Finished;
        tracing::info!(
            round,
            submitted = submitted.len(),
            successful = summary.successful,
            failed = summary.failed,
            withdrawn = summary.withdrawn,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            cancelled = summary.cancelled,
            "round finished"
        );
        emit(progress, ProgressUpdate::RoundFinished(summary.clone())).await;

        RoundReport {
            submitted,
            results,
            withdrawn,
            summary,
        }
    }

    /// Clone `repos` into `<base_dir>/<account>`, re-running only the
    /// repositories the filesystem still reports as missing, for at most
    /// `policy.max_rounds` rounds.
    pub async fn clone_with_retry(
        &mut self,
        account: &str,
        repos: Vec<Arc<Repository>>,
        cancel: &CancelToken,
        progress: Option<&mpsc::Sender<ProgressUpdate>>,
    ) -> Result<CloneReport, PreconditionError> {
        if repos.is_empty() {
            return Err(PreconditionError::NothingSelected);
        }
        let target = self.prepare_target_dir(account).await?;
        let policy = self.settings.policy;

        let mut rounds = Vec::new();
        let mut pending = repos.clone();
        let mut round = 1u32;
        let mut cancelled = false;
        loop {
            let jobs = pending
                .iter()
                .map(|repo| CloneJob::clone_into(Arc::clone(repo), target.clone()))
                .collect();
            let report = self
                .run_round(round, jobs, JobKind::Clone, cancel, progress)
                .await;
            let submitted = report.submitted.clone();
            cancelled = report.summary.cancelled;
            rounds.push(report);
            if cancelled {
                break;
            }

            let still = retry::still_failed(&submitted, &target).await;
            match policy.decide(round, still.len()) {
                RetryDecision::NoRetry => break,
                RetryDecision::RetryAfter(delay) => {
                    tracing::info!(
                        round,
                        remaining = still.len(),
                        delay_ms = delay.as_millis() as u64,
                        "retrying failed repositories"
                    );
                    emit(
                        progress,
                        ProgressUpdate::Retrying {
                            next_round: round + 1,
                            remaining: still.len(),
                            delay,
                        },
                    )
                    .await;
                    if !pause(delay, cancel).await {
                        cancelled = true;
                        break;
                    }
                    pending = still;
                    round += 1;
                }
            }
        }

        let still_failed = retry::still_failed(&repos, &target).await;
        Ok(CloneReport {
            target_dir: target,
            selected: repos.len(),
            rounds,
            still_failed,
            cancelled,
        })
    }

    /// Fast-forward every repository of `repos` that already has a valid
    /// local clone under `<base_dir>/<account>`. One round, no retries.
    pub async fn update_repositories(
        &mut self,
        account: &str,
        repos: Vec<Arc<Repository>>,
        cancel: &CancelToken,
        progress: Option<&mpsc::Sender<ProgressUpdate>>,
    ) -> Result<UpdateReport, PreconditionError> {
        if repos.is_empty() {
            return Err(PreconditionError::NothingSelected);
        }
        let target = self.prepare_target_dir(account).await?;

        let (local, skipped) = partition_local(repos, &target).await;
        if !skipped.is_empty() {
            tracing::info!(skipped = skipped.len(), "repositories without a local clone skipped");
        }
        let jobs = local
            .into_iter()
            .map(|repo| CloneJob::update(repo, target.clone()))
            .collect();
        let round = self
            .run_round(1, jobs, JobKind::Update, cancel, progress)
            .await;
        Ok(UpdateReport {
            target_dir: target,
            round,
            skipped,
        })
    }

    fn max_rounds(&self, kind: JobKind) -> u32 {
        match kind {
            JobKind::Clone => self.settings.policy.max_rounds,
            JobKind::Update => 1,
        }
    }
}

/// Split into (valid local clones, everything else), keeping order.
async fn partition_local(
    repos: Vec<Arc<Repository>>,
    target: &Path,
) -> (Vec<Arc<Repository>>, Vec<Arc<Repository>>) {
    let mut local = Vec::new();
    let mut missing = Vec::new();
    for repo in repos {
        if git::probe(&target.join(repo.dir_name())).await.is_valid_clone() {
            local.push(repo);
        } else {
            missing.push(repo);
        }
    }
    (local, missing)
}

/// Sleep for `delay` unless cancelled first. Returns false on cancellation.
async fn pause(delay: Duration, cancel: &CancelToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if delay.is_zero() {
        return true;
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

async fn emit(progress: Option<&mpsc::Sender<ProgressUpdate>>, update: ProgressUpdate) {
    if let Some(tx) = progress {
        // A renderer that went away must not stall the round.
        let _ = tx.send(update).await;
    }
}
