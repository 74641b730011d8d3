//! Tracks the status of uploaded mark-sheet batches.
//!
//! A batch runs inside the request that uploaded it, but its progress is
//! published here so `GET /api/upload/status/{batch_id}` can be polled while
//! the upload request is still in flight.
//!
//! - `JobsState`: clonable shared map of batch id to `BatchStatus`, injected
//!   into the Actix application state in `main.rs`.
//! - `JobUpdate`: a status change sent over the MPSC channel.
//! - `start_job_updater`: the single writer that applies `JobUpdate`s.
//! - `ProgressReporter`: the sending side handed to one pipeline run.
//!
//! Finished batches (`Completed` or `Failed`) stay visible for the retention
//! window and are pruned whenever a new batch is registered.

use common::jobs::BatchStatus;
use log::debug;
use std::time::{Duration, Instant};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

/// How long a finished batch stays queryable by default.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Latest status of one batch and when it last changed.
#[derive(Debug, Clone)]
pub struct JobEntry {
    pub status: BatchStatus,
    pub updated_at: Instant,
}

impl JobEntry {
    fn new(status: BatchStatus) -> Self {
        Self {
            status,
            updated_at: Instant::now(),
        }
    }

    fn is_finished(&self) -> bool {
        matches!(self.status, BatchStatus::Completed(_) | BatchStatus::Failed(_))
    }
}

/// Shared state of all batches seen by this process.
#[derive(Clone)]
pub struct JobsState {
    /// Batch id to its latest status.
    pub jobs: Arc<RwLock<HashMap<String, JobEntry>>>,

    /// Producers push `JobUpdate`s here; `start_job_updater` owns the receiver.
    pub tx: mpsc::Sender<JobUpdate>,

    retention: Duration,
}

impl JobsState {
    /// Creates the state together with the receiver its updater must drain.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<JobUpdate>) {
        Self::with_retention(capacity, DEFAULT_RETENTION)
    }

    pub fn with_retention(
        capacity: usize,
        retention: Duration,
    ) -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(capacity);
        let state = Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
            retention,
        };
        (state, rx)
    }

    /// Registers a new batch as `Received` and returns a reporter bound to it.
    ///
    /// Finished batches older than the retention window are dropped first.
    pub async fn register(&self, batch_id: &str) -> ProgressReporter {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, entry| {
            !entry.is_finished() || entry.updated_at.elapsed() < self.retention
        });
        if jobs.len() < before {
            debug!("Pruned {} finished batches", before - jobs.len());
        }
        jobs.insert(batch_id.to_string(), JobEntry::new(BatchStatus::Received));
        drop(jobs);

        ProgressReporter {
            batch_id: batch_id.to_string(),
            tx: Some(self.tx.clone()),
        }
    }

    pub async fn status(&self, batch_id: &str) -> Option<BatchStatus> {
        self.jobs
            .read()
            .await
            .get(batch_id)
            .map(|entry| entry.status.clone())
    }
}

/// A status change for one batch.
#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) batch_id: String,
    pub(crate) status: BatchStatus,
}

/// Applies `JobUpdate`s to the shared map until every sender is dropped.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        jobs.insert(update.batch_id, JobEntry::new(update.status));
    }
}

/// Sends status updates for a single batch.
///
/// Reporting never fails the batch: if the updater is gone the update is
/// dropped.
#[derive(Clone, Debug)]
pub struct ProgressReporter {
    batch_id: String,
    tx: Option<mpsc::Sender<JobUpdate>>,
}

impl ProgressReporter {
    /// A reporter that discards every update.
    pub fn disabled() -> Self {
        Self {
            batch_id: String::new(),
            tx: None,
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub async fn report(&self, status: BatchStatus) {
        let Some(tx) = &self.tx else {
            return;
        };
        let update = JobUpdate {
            batch_id: self.batch_id.clone(),
            status,
        };
        if tx.send(update).await.is_err() {
            debug!("status updater stopped; dropping update for {}", self.batch_id);
        }
    }
}
