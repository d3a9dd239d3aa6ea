//! Fixed-size worker pool draining the async job queue.
//!
//! Submission enqueues the job id onto a bounded channel; a full channel
//! rejects the submission (503) rather than silently dropping it. Workers
//! share the receiver and run the same render pipeline as the sync path,
//! under the per-job deadline. Cancellation is best-effort: a running
//! compile is not preempted, its result is discarded when it lands.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::{error_body, AppError};
use crate::models::DocumentRequest;
use crate::render::{generate_with_deadline, RenderContext};

use super::{JobRecord, JobState, JobStore};

/// Queued-but-unclaimed capacity per worker.
const QUEUE_DEPTH_PER_WORKER: usize = 8;
/// Local reaper cadence.
const REAP_INTERVAL_SECS: u64 = 60;

/// Cloneable handle to the job system.
#[derive(Clone)]
pub struct JobQueue {
    store: JobStore,
    tx: mpsc::Sender<Uuid>,
}

impl JobQueue {
    /// Spawns the worker pool and the retention reaper.
    pub fn start(store: JobStore, workers: usize, ctx: RenderContext) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel::<Uuid>(workers * QUEUE_DEPTH_PER_WORKER);
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..workers {
            tokio::spawn(worker_loop(
                worker_id,
                rx.clone(),
                store.clone(),
                ctx.clone(),
            ));
        }

        let reaper_store = store.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(REAP_INTERVAL_SECS));
            loop {
                interval.tick().await;
                reaper_store.reap_expired().await;
            }
        });

        Self { store, tx }
    }

    /// Accepts a request, persists the pending snapshot, and enqueues it.
    pub async fn submit(&self, request: DocumentRequest) -> Result<JobRecord, AppError> {
        let job = JobRecord::new(request);
        self.store.put(&job).await;

        match self.tx.try_send(job.id) {
            Ok(()) => {
                info!(job_id = %job.id, "job enqueued");
                Ok(job)
            }
            Err(_) => {
                warn!(job_id = %job.id, "job queue full, rejecting submission");
                let mut rejected = job;
                rejected.state = JobState::Failed;
                rejected.finished_at = Some(Utc::now());
                rejected.error = Some(
                    error_body(AppError::QueueFull.code(), "Job queue is full", json!({}))
                        ["error"]
                        .clone(),
                );
                self.store.put(&rejected).await;
                Err(AppError::QueueFull)
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<JobRecord> {
        self.store.get(id).await
    }

    /// Best-effort cancel: only pending jobs transition; anything else is
    /// returned unchanged.
    pub async fn cancel(&self, id: Uuid) -> Option<JobRecord> {
        let mut job = self.store.get(id).await?;
        if job.state == JobState::Pending {
            job.state = JobState::Cancelled;
            job.finished_at = Some(Utc::now());
            self.store.put(&job).await;
        }
        Some(job)
    }

    /// Result bytes for a successful job.
    pub async fn download(&self, id: Uuid) -> Result<(JobRecord, Vec<u8>), AppError> {
        let job = self
            .store
            .get(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;

        match job.state {
            JobState::Pending | JobState::Running => Err(AppError::JobNotReady {
                state: job.state.as_str().to_string(),
            }),
            JobState::Success => {
                let bytes = self.store.get_result(id).await.ok_or_else(|| {
                    AppError::NotFound(format!("Result for job {id} has expired"))
                })?;
                Ok((job, bytes))
            }
            JobState::Failed | JobState::Cancelled => Err(AppError::NotFound(format!(
                "Job {id} finished in state '{}'",
                job.state.as_str()
            ))),
        }
    }

    /// Jobs accepted but not yet claimed by a worker.
    pub fn queue_depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<Uuid>>>,
    store: JobStore,
    ctx: RenderContext,
) {
    loop {
        let id = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(id) = id else {
            break; // channel closed, process shutting down
        };

        let Some(mut job) = store.get(id).await else {
            warn!(worker_id, job_id = %id, "dequeued unknown job");
            continue;
        };
        if job.state == JobState::Cancelled {
            continue;
        }

        job.state = JobState::Running;
        store.put(&job).await;
        info!(worker_id, job_id = %id, "job started");

        let outcome = generate_with_deadline(&ctx, &job.request).await;

        // Cancelled mid-run: discard whatever the pipeline produced.
        if let Some(current) = store.get(id).await {
            if current.state == JobState::Cancelled {
                info!(worker_id, job_id = %id, "job cancelled mid-run, result discarded");
                continue;
            }
        }

        match outcome {
            Ok(document) => {
                store.put_result(id, document.bytes).await;
                job.state = JobState::Success;
                job.result_ref = Some(super::result_key(id));
                job.finished_at = Some(Utc::now());
                store.put(&job).await;
                info!(worker_id, job_id = %id, "job succeeded");
            }
            Err(err) => {
                let envelope = error_body(err.code(), &err.to_string(), json!({}));
                job.state = JobState::Failed;
                job.error = Some(envelope["error"].clone());
                job.finished_at = Some(Utc::now());
                store.put(&job).await;
                error!(worker_id, job_id = %id, "job failed: {err}");
            }
        }
    }
}
