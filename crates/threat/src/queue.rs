//! Threat work queue
//!
//! Submission only records the threat and enqueues its id. A fixed pool of
//! workers drains a bounded channel and runs the orchestrator; every job's
//! lifecycle is tracked so failures stay visible after the submitter has
//! moved on. Completed records are kept for a bounded window; failed
//! records stay until retried or cleared.

use crate::pipeline::ThreatHandler;
use crate::threat::ThreatId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Job identifier
pub type JobId = u64;

/// Completed job records retained for lookup
pub const COMPLETED_HISTORY: usize = 256;

/// Queue errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// Workers have shut down
    #[error("Threat queue is closed")]
    Closed,

    /// Channel at capacity; the job is recorded as failed and may be retried
    #[error("Threat queue is full; job {0} can be retried")]
    Full(JobId),

    /// No job with this id
    #[error("Unknown job: {0}")]
    UnknownJob(JobId),

    /// Only failed jobs may be retried
    #[error("Job {0} has not failed")]
    NotFailed(JobId),
}

impl From<QueueError> for convoy_core::Error {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Closed | QueueError::Full(_) => {
                convoy_core::Error::TransientBackend(err.to_string())
            }
            QueueError::UnknownJob(id) => convoy_core::Error::not_found("job", id),
            QueueError::NotFailed(_) => convoy_core::Error::Validation(err.to_string()),
        }
    }
}

/// Lifecycle of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Waiting for a worker
    Queued,
    /// A worker is running the pipeline
    Running,
    /// Pipeline finished
    Completed,
    /// Pipeline aborted
    Failed {
        /// Error that stopped the run
        reason: String,
    },
}

impl JobState {
    /// Completed or Failed
    pub fn is_settled(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed { .. })
    }
}

/// Tracked job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job identity
    pub id: JobId,
    /// Threat being processed
    pub threat_id: ThreatId,
    /// Current state
    pub state: JobState,
    /// Runs started, including retries
    pub attempts: u32,
    /// Last time the job was queued
    pub enqueued_at: DateTime<Utc>,
    /// Time the last run settled
    pub finished_at: Option<DateTime<Utc>>,
}

/// Aggregate queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMetrics {
    /// Jobs waiting for a worker
    pub queued: u64,
    /// Jobs being run
    pub in_flight: u64,
    /// Runs that finished
    pub completed: u64,
    /// Runs that failed
    pub failed: u64,
    /// Total pipeline time across settled runs (ms)
    pub total_processing_ms: u64,
    /// Slowest settled run (ms)
    pub max_processing_ms: u64,
}

impl QueueMetrics {
    fn record_run(&mut self, elapsed_ms: u64, ok: bool) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if ok {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
        self.total_processing_ms += elapsed_ms;
        self.max_processing_ms = self.max_processing_ms.max(elapsed_ms);
    }
}

#[derive(Default)]
struct TrackerState {
    jobs: HashMap<JobId, JobRecord>,
    // Completed ids, oldest first
    completed: VecDeque<JobId>,
    metrics: QueueMetrics,
}

/// Job lifecycle bookkeeping
pub struct JobTracker {
    state: Mutex<TrackerState>,
    next_id: AtomicU64,
    changed: Notify,
    history: usize,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::with_history(COMPLETED_HISTORY)
    }
}

impl JobTracker {
    /// Empty tracker keeping [`COMPLETED_HISTORY`] completed records
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty tracker keeping at most `history` completed records
    pub fn with_history(history: usize) -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            next_id: AtomicU64::new(0),
            changed: Notify::new(),
            history,
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut TrackerState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let out = f(&mut state);
        drop(state);
        self.changed.notify_waiters();
        out
    }

    fn register(&self, threat_id: ThreatId) -> JobId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.with_state(|s| {
            s.jobs.insert(
                id,
                JobRecord {
                    id,
                    threat_id,
                    state: JobState::Queued,
                    attempts: 0,
                    enqueued_at: Utc::now(),
                    finished_at: None,
                },
            );
            s.metrics.queued += 1;
        });
        id
    }

    fn requeue(&self, id: JobId) -> Result<ThreatId, QueueError> {
        self.with_state(|s| {
            let job = s.jobs.get_mut(&id).ok_or(QueueError::UnknownJob(id))?;
            if !matches!(job.state, JobState::Failed { .. }) {
                return Err(QueueError::NotFailed(id));
            }
            job.state = JobState::Queued;
            job.enqueued_at = Utc::now();
            job.finished_at = None;
            s.metrics.queued += 1;
            Ok(job.threat_id)
        })
    }

    // Undo a registration whose send never reached the channel
    fn abandon(&self, id: JobId, reason: &str) {
        self.with_state(|s| {
            if let Some(job) = s.jobs.get_mut(&id) {
                job.state = JobState::Failed {
                    reason: reason.to_string(),
                };
                job.finished_at = Some(Utc::now());
            }
            s.metrics.queued = s.metrics.queued.saturating_sub(1);
            s.metrics.failed += 1;
        });
    }

    fn start(&self, id: JobId) {
        self.with_state(|s| {
            if let Some(job) = s.jobs.get_mut(&id) {
                job.state = JobState::Running;
                job.attempts += 1;
            }
            s.metrics.queued = s.metrics.queued.saturating_sub(1);
            s.metrics.in_flight += 1;
        });
    }

    fn finish(&self, id: JobId, outcome: JobState, elapsed_ms: u64) {
        self.with_state(|s| {
            let ok = outcome == JobState::Completed;
            if let Some(job) = s.jobs.get_mut(&id) {
                job.state = outcome;
                job.finished_at = Some(Utc::now());
                if ok {
                    s.completed.push_back(id);
                }
            }
            s.metrics.record_run(elapsed_ms, ok);

            while s.completed.len() > self.history {
                let Some(oldest) = s.completed.pop_front() else { break };
                if s.jobs.get(&oldest).is_some_and(|j| j.state == JobState::Completed) {
                    s.jobs.remove(&oldest);
                }
            }
        });
    }

    /// Drop every completed and failed record; queued and running jobs stay.
    pub fn clear_settled(&self) -> usize {
        self.with_state(|s| {
            let before = s.jobs.len();
            s.jobs.retain(|_, job| !job.state.is_settled());
            s.completed.clear();
            before - s.jobs.len()
        })
    }

    /// Records currently held
    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).jobs.len()
    }

    /// True when no records are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One job
    pub fn get(&self, id: JobId) -> Option<JobRecord> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.jobs.get(&id).cloned()
    }

    /// Failed jobs, oldest id first
    pub fn failed(&self) -> Vec<JobRecord> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut failed: Vec<JobRecord> = state
            .jobs
            .values()
            .filter(|j| matches!(j.state, JobState::Failed { .. }))
            .cloned()
            .collect();
        failed.sort_by_key(|j| j.id);
        failed
    }

    /// Current counters
    pub fn metrics(&self) -> QueueMetrics {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).metrics
    }

    /// Wait until a job completes or fails; `None` for an unknown or pruned id.
    pub async fn settled(&self, id: JobId) -> Option<JobRecord> {
        loop {
            let notified = self.changed.notified();
            let job = self.get(id)?;
            if job.state.is_settled() {
                return Some(job);
            }
            notified.await;
        }
    }

    /// Wait until nothing is queued or running.
    pub async fn idle(&self) {
        loop {
            let notified = self.changed.notified();
            let m = self.metrics();
            if m.queued == 0 && m.in_flight == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Job {
    id: JobId,
    threat_id: ThreatId,
}

/// Bounded queue in front of a worker pool
pub struct ThreatWorkQueue {
    tx: mpsc::Sender<Job>,
    tracker: Arc<JobTracker>,
}

impl ThreatWorkQueue {
    /// Spawn `workers` tasks draining a channel of `capacity` jobs.
    ///
    /// Workers exit once every queue handle is dropped and the channel drains.
    pub fn start(
        handler: Arc<dyn ThreatHandler>,
        workers: usize,
        capacity: usize,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(AsyncMutex::new(rx));
        let tracker = Arc::new(JobTracker::new());

        let handles = (0..workers.max(1))
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let tracker = Arc::clone(&tracker);
                let handler = Arc::clone(&handler);
                tokio::spawn(run_worker(worker, rx, handler, tracker))
            })
            .collect();

        info!(workers = workers.max(1), capacity = capacity.max(1), "Threat queue started");
        (Self { tx, tracker }, handles)
    }

    /// Queue a threat for processing without waiting on the workers.
    ///
    /// A full channel fails the job at once with [`QueueError::Full`]; the
    /// record stays so the job can be retried.
    pub fn enqueue(&self, threat_id: ThreatId) -> Result<JobId, QueueError> {
        let id = self.tracker.register(threat_id);
        self.send(Job { id, threat_id })?;
        debug!(job_id = id, threat_id, "Threat job queued");
        Ok(id)
    }

    /// Run a failed job again from the start.
    pub fn retry(&self, id: JobId) -> Result<JobId, QueueError> {
        let threat_id = self.tracker.requeue(id)?;
        self.send(Job { id, threat_id })?;
        info!(job_id = id, threat_id, "Threat job requeued");
        Ok(id)
    }

    fn send(&self, job: Job) -> Result<(), QueueError> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.tracker.abandon(job.id, "queue full");
                warn!(job_id = job.id, threat_id = job.threat_id, "Threat queue full, job failed");
                Err(QueueError::Full(job.id))
            }
            Err(TrySendError::Closed(_)) => {
                self.tracker.abandon(job.id, "queue closed");
                Err(QueueError::Closed)
            }
        }
    }

    /// Job bookkeeping
    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    /// Current counters
    pub fn metrics(&self) -> QueueMetrics {
        self.tracker.metrics()
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<AsyncMutex<mpsc::Receiver<Job>>>,
    handler: Arc<dyn ThreatHandler>,
    tracker: Arc<JobTracker>,
) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(job) = next else { break };

        tracker.start(job.id);
        let started = Instant::now();
        let result = handler.handle(job.threat_id).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(report) => {
                debug!(
                    worker,
                    job_id = job.id,
                    threat_id = job.threat_id,
                    updated = report.updated.len(),
                    elapsed_ms,
                    "Threat job completed"
                );
                tracker.finish(job.id, JobState::Completed, elapsed_ms);
            }
            Err(e) => {
                error!(
                    worker,
                    job_id = job.id,
                    threat_id = job.threat_id,
                    error = %e,
                    "Threat job failed"
                );
                tracker.finish(
                    job.id,
                    JobState::Failed {
                        reason: e.to_string(),
                    },
                    elapsed_ms,
                );
            }
        }
    }
    debug!(worker, "Threat worker stopped");
}
