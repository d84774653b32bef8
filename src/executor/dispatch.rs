//! Dispatch Facade
//!
//! The single entry point for callers: `invoke` a function by name, `poll` a
//! job by id. Registry, job store and executor are passed in explicitly so
//! tests can build fresh instances.

use super::executor::Executor;
use super::registry::UdfRegistry;
use super::store::JobStore;
use super::types::*;
use crate::error::{UdfError, UdfResult};
use crate::logging::summarize;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Handle returned for an accepted async job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Result of `invoke`.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// Sync mode: the serialized response.
    Completed(Value),
    /// Async mode: the job to poll.
    Submitted(JobHandle),
}

pub struct Dispatcher {
    registry: Arc<UdfRegistry>,
    jobs: Arc<JobStore>,
    executor: Arc<Executor>,
}

impl Dispatcher {
    pub fn new(registry: Arc<UdfRegistry>, jobs: Arc<JobStore>, executor: Arc<Executor>) -> Self {
        Self {
            registry,
            jobs,
            executor,
        }
    }

    pub fn registry(&self) -> &UdfRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Looks up `name`, validates `raw` against its request contract, then runs
    /// it inline (sync) or hands it to the worker pool (async).
    ///
    /// Sync mode blocks the calling thread for the whole handler run.
    pub fn invoke(&self, name: &str, raw: Value) -> UdfResult<Invocation> {
        let record = self.registry.lookup(name)?;

        let call = match record.prepare(&raw) {
            Ok(call) => call,
            Err(e) => {
                tracing::info!(udf = name, error = %e, "Rejected invalid request");
                return Err(e);
            }
        };

        match record.mode {
            ExecutionMode::Sync => {
                tracing::info!(udf = name, request = %summarize(&call.input), "udf.sync.start");
                self.executor
                    .run_inline(name, call)
                    .map(Invocation::Completed)
            }
            ExecutionMode::Async => {
                tracing::debug!(udf = name, request = %summarize(&call.input), "Submitting job");
                self.executor.submit(name, call).map(|job_id| {
                    Invocation::Submitted(JobHandle {
                        job_id,
                        status: JobStatus::Queued,
                    })
                })
            }
        }
    }

    /// Non-blocking read of a job's current state.
    pub fn poll(&self, job_id: &str) -> UdfResult<JobSnapshot> {
        self.jobs
            .snapshot(&JobId(job_id.to_string()))
            .ok_or_else(|| UdfError::UnknownJob(job_id.to_string()))
    }
}
