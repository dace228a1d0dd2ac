//! Fixed-size worker pool fed by a bounded FIFO job queue.
//!
//! Workers share one receiver; whichever is idle claims the next job. The
//! result stream closes only after the last worker has exited, so the
//! aggregator can simply read until `None`. Jobs still queued when the
//! workers stop on cancellation are handed back by `join`.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::control::{CancelToken, RoundCancelled};
use crate::git::{CloneExecutor, CloneTool};

use super::job::{CloneJob, WorkerEvent};

/// Why a job could not be queued.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Cancelled(#[from] RoundCancelled),
    #[error("job queue is closed")]
    Closed,
}

pub struct WorkerPool {
    jobs: Option<mpsc::Sender<CloneJob>>,
    queue: Arc<Mutex<mpsc::Receiver<CloneJob>>>,
    workers: JoinSet<()>,
    cancel: CancelToken,
}

impl WorkerPool {
    /// Spawn `workers` tasks (at least one). Queue and result stream are both
    /// bounded at twice the worker count.
    pub fn start<T: CloneTool>(
        executor: Arc<CloneExecutor<T>>,
        workers: usize,
        cancel: CancelToken,
    ) -> (Self, mpsc::Receiver<WorkerEvent>) {
        let workers = workers.max(1);
        let (job_tx, job_rx) = mpsc::channel::<CloneJob>(workers * 2);
        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>(workers * 2);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let mut set = JoinSet::new();
        for id in 0..workers {
            set.spawn(worker_loop(
                id,
                Arc::clone(&executor),
                Arc::clone(&job_rx),
                event_tx.clone(),
                cancel.clone(),
            ));
        }
        // Only workers hold result senders from here on.
        drop(event_tx);
        tracing::debug!(workers, "worker pool started");

        (
            Self {
                jobs: Some(job_tx),
                queue: job_rx,
                workers: set,
                cancel,
            },
            event_rx,
        )
    }

    /// Enqueue one job, waiting while the queue is full. Gives up as soon as
    /// cancellation is raised.
    pub async fn submit(&self, job: CloneJob) -> Result<(), SubmitError> {
        let tx = self.jobs.as_ref().ok_or(SubmitError::Closed)?;
        if self.cancel.is_cancelled() {
            return Err(RoundCancelled.into());
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RoundCancelled.into()),
            sent = tx.send(job) => sent.map_err(|_| SubmitError::Closed),
        }
    }

    /// No more jobs. Workers drain what is queued, then exit.
    pub fn close(&mut self) {
        self.jobs = None;
    }

    /// Wait for every worker to exit. Closes the queue first.
    ///
    /// Returns the jobs no worker claimed, in queue order. Empty unless the
    /// workers stopped on cancellation.
    pub async fn join(mut self) -> Vec<CloneJob> {
        self.close();
        while let Some(res) = self.workers.join_next().await {
            if let Err(e) = res {
                tracing::error!("worker task failed: {}", e);
            }
        }

        let mut rx = self.queue.lock().await;
        rx.close();
        let mut unclaimed = Vec::new();
        while let Ok(job) = rx.try_recv() {
            unclaimed.push(job);
        }
        if !unclaimed.is_empty() {
            tracing::info!(unclaimed = unclaimed.len(), "queued jobs withdrawn");
        }
        tracing::debug!("worker pool stopped");
        unclaimed
    }
}

async fn worker_loop<T: CloneTool>(
    id: usize,
    executor: Arc<CloneExecutor<T>>,
    jobs: Arc<Mutex<mpsc::Receiver<CloneJob>>>,
    events: mpsc::Sender<WorkerEvent>,
    cancel: CancelToken,
) {
    loop {
        let next = {
            let mut rx = jobs.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                job = rx.recv() => job,
            }
        };
        let Some(job) = next else {
            break;
        };

        tracing::debug!(worker = id, repo = %job.repo.name, "job claimed");
        let _ = events
            .send(WorkerEvent::Started {
                repo: Arc::clone(&job.repo),
                kind: job.kind,
            })
            .await;
        let result = job.execute(&*executor).await;
        if events.send(WorkerEvent::Finished(result)).await.is_err() {
            tracing::warn!(worker = id, "result stream closed; worker exiting");
            break;
        }
    }
    tracing::debug!(worker = id, "worker exited");
}
