//! Jobs, results and worker events.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{CloneError, ErrorKind};
use crate::git::{CloneExecutor, CloneTool};
use crate::repository::Repository;

/// What a worker does with a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Fresh clone into a directory that must not exist yet.
    Clone,
    /// Fast-forward-only pull of an existing clone.
    Update,
}

impl JobKind {
    /// Present participle used in activity labels.
    pub fn verb(self) -> &'static str {
        match self {
            JobKind::Clone => "Cloning",
            JobKind::Update => "Updating",
        }
    }
}

/// One unit of work. Consumed exactly once by a worker.
#[derive(Debug, Clone)]
pub struct CloneJob {
    pub repo: Arc<Repository>,
    /// Account directory; the repository lands in `<target_dir>/<dir name>`.
    pub target_dir: PathBuf,
    pub kind: JobKind,
}

impl CloneJob {
    pub fn clone_into(repo: Arc<Repository>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            target_dir: target_dir.into(),
            kind: JobKind::Clone,
        }
    }

    pub fn update(repo: Arc<Repository>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            target_dir: target_dir.into(),
            kind: JobKind::Update,
        }
    }

    /// Final path of this repository on disk.
    pub fn destination(&self) -> PathBuf {
        self.target_dir.join(self.repo.dir_name())
    }

    /// Run the job once against `executor`. Never fails: the error is part of the result.
    pub async fn execute<T: CloneTool>(self, executor: &CloneExecutor<T>) -> CloneResult {
        let start = Instant::now();
        let outcome = match self.kind {
            JobKind::Clone => executor
                .clone_into(&self.repo, &self.target_dir)
                .await
                .map(|_| ()),
            JobKind::Update => executor.update(&self.destination()).await,
        };
        CloneResult {
            repo: self.repo,
            kind: self.kind,
            error: outcome.err(),
            duration: start.elapsed(),
        }
    }
}

/// Outcome of one job. `error` is `None` exactly when the job succeeded.
#[derive(Debug)]
pub struct CloneResult {
    pub repo: Arc<Repository>,
    pub kind: JobKind,
    pub error: Option<CloneError>,
    pub duration: Duration,
}

impl CloneResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(CloneError::kind)
    }
}

/// Messages on the result stream, from workers to the aggregator.
#[derive(Debug)]
pub enum WorkerEvent {
    /// A worker claimed a job and is about to run it.
    Started { repo: Arc<Repository>, kind: JobKind },
    /// Exactly one per claimed job.
    Finished(CloneResult),
}
