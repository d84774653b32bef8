//! Worker Pool Implementation
//!
//! Runs prepared calls either inline on the caller's context (sync mode) or on
//! a fixed set of background workers (async mode).
//!
//! ## Admission
//! At most `workers + queue_depth` async jobs may be in flight. Each accepted
//! job holds a semaphore permit until its handler actually returns, so a full
//! pool rejects new work with `Overloaded` instead of buffering it.
//!
//! ## Lifecycle of an async job
//! 1. `submit` acquires a permit, stores the job as `Queued`, and enqueues it.
//! 2. A worker dequeues it, claims it (`Running`), and runs the handler on the
//!    blocking thread pool.
//! 3. The worker records `Done` or `Error`. A job is never left `Running`
//!    once its handler has returned, panicked, or timed out.

use super::registry::{CallFailure, PreparedCall};
use super::store::JobStore;
use super::types::*;
use crate::error::{UdfError, UdfResult};

use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore, mpsc};

/// Sizing of the async worker pool.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Jobs that may wait for a worker beyond those being executed.
    pub queue_depth: usize,
    /// Jobs whose handler runs longer than this are marked `Error`.
    pub handler_timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: default_worker_count(),
            queue_depth: 64,
            handler_timeout: None,
        }
    }
}

/// One less than the available cores, at least 2 and at most 8.
pub fn default_worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    cpus.saturating_sub(1).clamp(2, 8)
}

struct QueuedJob {
    job_id: JobId,
    function: String,
    call: PreparedCall,
    permit: OwnedSemaphorePermit,
}

/// The engine that drives handler execution.
pub struct Executor {
    jobs: Arc<JobStore>,
    sender: mpsc::Sender<QueuedJob>,
    admission: Arc<Semaphore>,
    capacity: usize,
    worker_count: usize,
}

impl Executor {
    /// Spawns the workers and returns immediately. Must be called inside a tokio runtime.
    ///
    /// Workers exit once the returned executor is dropped and the queue drains.
    pub fn start(jobs: Arc<JobStore>, config: ExecutorConfig) -> Arc<Self> {
        let worker_count = config.workers.clamp(1, Semaphore::MAX_PERMITS);
        let capacity = worker_count
            .saturating_add(config.queue_depth)
            .min(Semaphore::MAX_PERMITS);

        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        for worker_id in 0..worker_count {
            let worker = Worker {
                id: worker_id,
                jobs: jobs.clone(),
                handler_timeout: config.handler_timeout,
            };
            let receiver = receiver.clone();
            tokio::spawn(async move {
                worker.run(receiver).await;
            });
        }

        tracing::info!(
            workers = worker_count,
            capacity,
            timeout_ms = config.handler_timeout.map(|t| t.as_millis() as u64),
            "Executor started"
        );

        Arc::new(Self {
            jobs,
            sender,
            admission: Arc::new(Semaphore::new(capacity)),
            capacity,
            worker_count,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Maximum number of async jobs queued or running at once.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Async jobs currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.admission.available_permits()
    }

    /// Synchronous path: runs the handler on the caller's thread and blocks until it returns.
    pub fn run_inline(&self, function: &str, call: PreparedCall) -> UdfResult<Value> {
        let t0 = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| call.run()))
            .unwrap_or_else(|payload| Err(CallFailure::Panicked(panic_message(payload.as_ref()))));

        let elapsed_ms = t0.elapsed().as_millis() as u64;
        match outcome {
            Ok(value) => {
                tracing::info!(udf = function, elapsed_ms, "udf.sync.done");
                Ok(value)
            }
            Err(failure) => {
                tracing::error!(udf = function, elapsed_ms, failure = ?failure, "udf.sync.error");
                Err(UdfError::Handler {
                    function: function.to_string(),
                    message: failure.public_message(),
                })
            }
        }
    }

    /// Asynchronous path: stores a `Queued` job and returns its id without waiting.
    ///
    /// # Errors
    /// `Overloaded` when `capacity` jobs are already in flight. No job is created.
    pub fn submit(&self, function: &str, call: PreparedCall) -> UdfResult<JobId> {
        let permit = self.admission.clone().try_acquire_owned().map_err(|_| {
            tracing::warn!(udf = function, capacity = self.capacity, "Worker pool saturated");
            UdfError::Overloaded {
                capacity: self.capacity,
            }
        })?;

        let job_id = self.jobs.create(function, call.input.clone());
        let job = QueuedJob {
            job_id: job_id.clone(),
            function: function.to_string(),
            call,
            permit,
        };

        if let Err(e) = self.sender.try_send(job) {
            self.jobs.discard(&job_id);
            return Err(match e {
                TrySendError::Full(_) => UdfError::Overloaded {
                    capacity: self.capacity,
                },
                TrySendError::Closed(_) => {
                    UdfError::Internal("worker pool is shut down".to_string())
                }
            });
        }

        tracing::info!(udf = function, job_id = %job_id, "udf.async.submit");
        Ok(job_id)
    }
}

struct Worker {
    id: usize,
    jobs: Arc<JobStore>,
    handler_timeout: Option<Duration>,
}

impl Worker {
    async fn run(self, receiver: Arc<Mutex<mpsc::Receiver<QueuedJob>>>) {
        tracing::debug!("Worker {} started", self.id);

        loop {
            let next = {
                let mut receiver = receiver.lock().await;
                receiver.recv().await
            };

            match next {
                Some(job) => self.execute(job).await,
                None => break,
            }
        }

        tracing::debug!("Worker {} stopped", self.id);
    }

    async fn execute(&self, job: QueuedJob) {
        let QueuedJob {
            job_id,
            function,
            call,
            permit,
        } = job;

        if let Err(e) = self.jobs.try_claim(&job_id) {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to claim job");
            return;
        }

        tracing::info!(udf = %function, job_id = %job_id, worker = self.id, "udf.async.start");
        let t0 = Instant::now();

        // The permit travels with the handler so the slot stays taken until the
        // handler really returns, even if the job already timed out.
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            call.run()
        });

        let joined = match self.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    let message = format!("handler timed out after {} ms", limit.as_millis());
                    self.finish(&job_id, &function, t0, Err(message));
                    return;
                }
            },
            None => handle.await,
        };

        let outcome = match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(failure)) => {
                if let CallFailure::Serialization(detail) = &failure {
                    tracing::error!(udf = %function, job_id = %job_id, detail = %detail, "Response serialization failed");
                }
                Err(failure.public_message())
            }
            Err(join_error) if join_error.is_panic() => {
                let payload = join_error.into_panic();
                Err(CallFailure::Panicked(panic_message(payload.as_ref())).public_message())
            }
            Err(join_error) => {
                tracing::error!(job_id = %job_id, error = %join_error, "Handler task aborted");
                Err("internal error while running the handler".to_string())
            }
        };

        self.finish(&job_id, &function, t0, outcome);
    }

    fn finish(&self, job_id: &JobId, function: &str, t0: Instant, outcome: Result<Value, String>) {
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => tracing::info!(udf = function, job_id = %job_id, elapsed_ms, "udf.async.done"),
            Err(error) => {
                tracing::error!(udf = function, job_id = %job_id, elapsed_ms, error = %error, "udf.async.error")
            }
        }

        if let Err(e) = self.jobs.complete(job_id, outcome) {
            tracing::error!(job_id = %job_id, error = %e, "Failed to complete job");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
