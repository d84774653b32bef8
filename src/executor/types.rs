use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a job.
///
/// Wrapper around a UUID v4 string. Ids are generated at submission and never reused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generates a new random UUID v4-based JobId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a registered function is invoked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// The caller blocks until the response is available.
    Sync,
    /// The caller gets a job id back and polls for the result.
    Async,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sync => f.write_str("sync"),
            ExecutionMode::Async => f.write_str("async"),
        }
    }
}

/// Wire-level status of a job, without payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// The only legal edges are `queued -> running` and `running -> done | error`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Done)
                | (JobStatus::Running, JobStatus::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of a job.
///
/// The result lives only in `Done` and the error only in `Error`, so a job can
/// never carry a result without being done or an error without having failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum JobState {
    /// Accepted by the pool, not yet picked up by a worker.
    Queued,
    /// A worker is executing the handler.
    Running,
    /// Handler returned and its response was serialized.
    Done { result: serde_json::Value },
    /// Handler failed, timed out, panicked, or its response could not be serialized.
    Error { error: String },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Queued => JobStatus::Queued,
            JobState::Running => JobStatus::Running,
            JobState::Done { .. } => JobStatus::Done,
            JobState::Error { .. } => JobStatus::Error,
        }
    }
}

/// The record held by the `JobStore` for each submitted job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEntry {
    /// Name of the registered function the job was submitted against.
    pub function: String,
    /// Normalized JSON form of the validated request.
    pub input: serde_json::Value,
    /// Current execution state.
    pub state: JobState,
    /// Timestamp (ms) when the job was submitted.
    pub created_at: u64,
    /// Timestamp (ms) when the job reached a terminal state.
    pub finished_at: Option<u64>,
}

impl JobEntry {
    pub fn queued(function: &str, input: serde_json::Value) -> Self {
        Self {
            function: function.to_string(),
            input,
            state: JobState::Queued,
            created_at: now_ms(),
            finished_at: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }
}

/// Read-only copy of a job handed to pollers.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub function: String,
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: u64,
    pub finished_at: Option<u64>,
}

impl JobSnapshot {
    pub fn from_entry(job_id: &JobId, entry: &JobEntry) -> Self {
        let (result, error) = match &entry.state {
            JobState::Done { result } => (Some(result.clone()), None),
            JobState::Error { error } => (None, Some(error.clone())),
            JobState::Queued | JobState::Running => (None, None),
        };

        Self {
            job_id: job_id.clone(),
            function: entry.function.clone(),
            status: entry.status(),
            result,
            error,
            created_at: entry.created_at,
            finished_at: entry.finished_at,
        }
    }
}

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
