//! Async job facility: job model and the KV-backed job store.
//!
//! Jobs are persisted under `job:{uuid}` in the same Redis backend as the
//! document cache, with result bytes under `job:{uuid}:result`. A local
//! in-memory mirror keeps the surface serving when the backend is down; the
//! mirror is reaped on the same retention clock Redis TTLs enforce.

pub mod handlers;
pub mod worker;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::models::DocumentRequest;

/// Terminal jobs are kept for one hour, then reaped.
pub const RETENTION_SECONDS: u64 = 3_600;
/// Safety TTL for jobs that never reach a terminal state.
const PENDING_TTL_SECONDS: u64 = 86_400;
/// Bounded timeout for job-store KV round-trips.
const OP_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failed | JobState::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Success => "success",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }
}

/// One submitted job: request snapshot plus state-machine bookkeeping.
/// `result_ref` and `error` are mutually exclusive by construction: only
/// success sets the former, only failure the latter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub state: JobState,
    pub request: DocumentRequest,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result_ref: Option<String>,
    pub error: Option<Value>,
}

impl JobRecord {
    pub fn new(request: DocumentRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: JobState::Pending,
            request,
            created_at: Utc::now(),
            finished_at: None,
            result_ref: None,
            error: None,
        }
    }
}

fn job_key(id: Uuid) -> String {
    format!("job:{id}")
}

fn result_key(id: Uuid) -> String {
    format!("job:{id}:result")
}

/// Job store: write-through to Redis, read-through from the local mirror.
#[derive(Clone)]
pub struct JobStore {
    conn: Option<ConnectionManager>,
    jobs: Arc<RwLock<HashMap<Uuid, JobRecord>>>,
    results: Arc<RwLock<HashMap<Uuid, Vec<u8>>>>,
}

impl JobStore {
    pub fn new(conn: Option<ConnectionManager>) -> Self {
        Self {
            conn,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            results: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn put(&self, job: &JobRecord) {
        self.jobs.write().await.insert(job.id, job.clone());

        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        let Ok(payload) = serde_json::to_string(job) else {
            return;
        };
        let ttl = if job.state.is_terminal() {
            RETENTION_SECONDS
        } else {
            PENDING_TTL_SECONDS
        };
        let write = conn.set_ex::<_, _, ()>(job_key(job.id), payload, ttl);
        if !matches!(tokio::time::timeout(OP_TIMEOUT, write).await, Ok(Ok(()))) {
            warn!(job_id = %job.id, "job store write failed");
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<JobRecord> {
        if let Some(job) = self.jobs.read().await.get(&id) {
            return Some(job.clone());
        }
        let mut conn = self.conn.clone()?;
        let read = conn.get::<_, Option<String>>(job_key(id));
        match tokio::time::timeout(OP_TIMEOUT, read).await {
            Ok(Ok(Some(payload))) => serde_json::from_str(&payload).ok(),
            _ => None,
        }
    }

    pub async fn put_result(&self, id: Uuid, bytes: Vec<u8>) {
        if let Some(mut conn) = self.conn.clone() {
            let write = conn.set_ex::<_, _, ()>(result_key(id), bytes.as_slice(), RETENTION_SECONDS);
            if !matches!(tokio::time::timeout(OP_TIMEOUT, write).await, Ok(Ok(()))) {
                warn!(job_id = %id, "job result write failed");
            }
        }
        self.results.write().await.insert(id, bytes);
    }

    pub async fn get_result(&self, id: Uuid) -> Option<Vec<u8>> {
        if let Some(bytes) = self.results.read().await.get(&id) {
            return Some(bytes.clone());
        }
        let mut conn = self.conn.clone()?;
        let read = conn.get::<_, Option<Vec<u8>>>(result_key(id));
        match tokio::time::timeout(OP_TIMEOUT, read).await {
            Ok(Ok(found)) => found,
            _ => None,
        }
    }

    /// Drops local terminal jobs past the retention window. Redis copies
    /// expire on their own TTLs.
    pub async fn reap_expired(&self) {
        let cutoff = Utc::now() - chrono::Duration::seconds(RETENTION_SECONDS as i64);
        let expired: Vec<Uuid> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| {
                job.state.is_terminal()
                    && job.finished_at.map(|t| t < cutoff).unwrap_or(false)
            })
            .map(|job| job.id)
            .collect();
        if expired.is_empty() {
            return;
        }
        let mut jobs = self.jobs.write().await;
        let mut results = self.results.write().await;
        for id in expired {
            jobs.remove(&id);
            results.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentType, OutputFormat};
    use serde_json::json;

    fn request() -> DocumentRequest {
        DocumentRequest {
            document_type: DocumentType::Resume,
            template: "classic".to_string(),
            format: OutputFormat::Pdf,
            data: json!({"personalInfo": {"name": "A", "email": "a@b.co"}}),
            ultra_validation: false,
            spacing_mode: None,
        }
    }

    #[test]
    fn test_new_job_is_pending_with_no_outcome() {
        let job = JobRecord::new(request());
        assert_eq!(job.state, JobState::Pending);
        assert!(job.result_ref.is_none());
        assert!(job.error.is_none());
        assert!(job.finished_at.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Success.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }

    #[tokio::test]
    async fn test_store_round_trip_without_backend() {
        let store = JobStore::new(None);
        let job = JobRecord::new(request());
        store.put(&job).await;
        let loaded = store.get(job.id).await.unwrap();
        assert_eq!(loaded.id, job.id);
        assert_eq!(loaded.state, JobState::Pending);
    }

    #[tokio::test]
    async fn test_result_round_trip_without_backend() {
        let store = JobStore::new(None);
        let id = Uuid::new_v4();
        store.put_result(id, b"%PDF-fake".to_vec()).await;
        assert_eq!(store.get_result(id).await.unwrap(), b"%PDF-fake");
    }

    #[tokio::test]
    async fn test_reap_removes_old_terminal_jobs_only() {
        let store = JobStore::new(None);

        let mut old = JobRecord::new(request());
        old.state = JobState::Success;
        old.finished_at = Some(Utc::now() - chrono::Duration::seconds(7200));
        store.put(&old).await;

        let mut fresh = JobRecord::new(request());
        fresh.state = JobState::Failed;
        fresh.finished_at = Some(Utc::now());
        store.put(&fresh).await;

        let pending = JobRecord::new(request());
        store.put(&pending).await;

        store.reap_expired().await;
        assert!(store.get(old.id).await.is_none());
        assert!(store.get(fresh.id).await.is_some());
        assert!(store.get(pending.id).await.is_some());
    }

    #[test]
    fn test_job_record_serializes_state_lowercase() {
        let job = JobRecord::new(request());
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["state"], "pending");
    }
}
