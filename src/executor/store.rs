//! In-Memory Job Store
//!
//! Holds every async job for the lifetime of the process (or until evicted by
//! the retention sweeper). Each entry has a single writer, the worker that
//! claimed it; any number of readers take cloned snapshots.
//!
//! ## State machine
//! `Queued -> Running -> Done | Error`. Any other transition is rejected with
//! [`StoreError::InvalidTransition`] and leaves the entry untouched.

use super::types::*;

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("invalid transition from {from} to {to} for job {job_id}")]
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
}

/// Per-status job counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub queued: usize,
    pub running: usize,
    pub done: usize,
    pub error: usize,
}

pub struct JobStore {
    jobs: DashMap<JobId, JobEntry>,
}

impl JobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            jobs: DashMap::new(),
        })
    }

    /// Allocates a new job in the `Queued` state.
    pub fn create(&self, function: &str, input: Value) -> JobId {
        let job_id = JobId::new();
        self.jobs
            .insert(job_id.clone(), JobEntry::queued(function, input));
        tracing::debug!(job_id = %job_id, udf = function, "Stored queued job");
        job_id
    }

    /// Removes a job that was never handed to a worker.
    pub fn discard(&self, job_id: &JobId) -> Option<JobEntry> {
        self.jobs.remove(job_id).map(|(_, entry)| entry)
    }

    /// `Queued -> Running`. Called by the worker right before the handler runs.
    pub fn try_claim(&self, job_id: &JobId) -> Result<(), StoreError> {
        self.transition(job_id, JobState::Running)
    }

    /// `Running -> Done` on `Ok`, `Running -> Error` on `Err`.
    pub fn complete(&self, job_id: &JobId, outcome: Result<Value, String>) -> Result<(), StoreError> {
        let next = match outcome {
            Ok(result) => JobState::Done { result },
            Err(error) => JobState::Error { error },
        };
        self.transition(job_id, next)
    }

    fn transition(&self, job_id: &JobId, next: JobState) -> Result<(), StoreError> {
        let mut entry = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::NotFound(job_id.clone()))?;

        let from = entry.status();
        let to = next.status();
        if !from.can_transition_to(to) {
            tracing::warn!(job_id = %job_id, %from, %to, "Rejected job transition");
            return Err(StoreError::InvalidTransition {
                job_id: job_id.clone(),
                from,
                to,
            });
        }

        entry.state = next;
        if to.is_terminal() {
            entry.finished_at = Some(now_ms());
        }

        tracing::trace!(job_id = %job_id, %from, %to, "Job transitioned");
        Ok(())
    }

    pub fn snapshot(&self, job_id: &JobId) -> Option<JobSnapshot> {
        self.jobs
            .get(job_id)
            .map(|entry| JobSnapshot::from_entry(job_id, entry.value()))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();

        for entry in self.jobs.iter() {
            match entry.status() {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Done => counts.done += 1,
                JobStatus::Error => counts.error += 1,
            }
        }

        counts
    }

    /// Drops terminal jobs that finished before `cutoff_ms`. Queued and running
    /// jobs are never evicted. Returns the number of removed jobs.
    pub fn evict_finished_before(&self, cutoff_ms: u64) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, entry| match entry.finished_at {
            Some(finished_at) => finished_at >= cutoff_ms,
            None => true,
        });
        before.saturating_sub(self.jobs.len())
    }
}

/// Jobs that finished before the returned instant have outlived `ttl`. A TTL
/// too large for `u64` milliseconds keeps everything.
pub fn retention_cutoff(now: u64, ttl: Duration) -> u64 {
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    now.saturating_sub(ttl_ms)
}

/// Spawns the background task enforcing the retention policy: every
/// `interval`, jobs that have been terminal for longer than `ttl` are dropped.
pub fn spawn_retention_sweeper(
    store: Arc<JobStore>,
    ttl: Duration,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let cutoff = retention_cutoff(now_ms(), ttl);
            let evicted = store.evict_finished_before(cutoff);
            if evicted > 0 {
                tracing::info!(evicted, remaining = store.len(), "Evicted finished jobs");
            }

            let counts = store.status_counts();
            tracing::debug!(
                queued = counts.queued,
                running = counts.running,
                done = counts.done,
                error = counts.error,
                "Job store stats"
            );
        }
    })
}
