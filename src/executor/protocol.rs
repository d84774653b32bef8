//! HTTP Protocol Definitions
//!
//! Data Transfer Objects returned by the HTTP handlers and the route paths
//! they are mounted on.

use super::registry::UdfRecord;
use super::types::*;
use serde::{Deserialize, Serialize};

pub const ENDPOINT_HEALTH: &str = "/health";
pub const ENDPOINT_UDF_LIST: &str = "/udf";
pub const ENDPOINT_UDF_INVOKE: &str = "/udf/:name";
/// POST submits an async function by name, GET polls a job by id.
pub const ENDPOINT_JOBS: &str = "/jobs/:key";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Poll response: `result` only when done, `error` only when failed.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: u64,
}

impl From<JobSnapshot> for JobStatusResponse {
    fn from(snapshot: JobSnapshot) -> Self {
        Self {
            job_id: snapshot.job_id,
            status: snapshot.status,
            result: snapshot.result,
            error: snapshot.error,
            created_at: snapshot.created_at,
        }
    }
}

/// One entry of the function catalogue.
#[derive(Debug, Serialize, Deserialize)]
pub struct UdfDescriptor {
    pub name: String,
    pub mode: ExecutionMode,
    pub description: String,
    pub tags: Vec<String>,
    pub version: Option<String>,
    pub request: String,
    pub response: String,
}

impl From<&UdfRecord> for UdfDescriptor {
    fn from(record: &UdfRecord) -> Self {
        Self {
            name: record.name.clone(),
            mode: record.mode,
            description: record.description.clone(),
            tags: record.tags.clone(),
            version: record.version.clone(),
            request: short_type_name(record.request_contract),
            response: short_type_name(record.response_contract),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UdfListResponse {
    pub count: usize,
    pub functions: Vec<UdfDescriptor>,
}

/// `udfkit::udfs::finance::NpvRequest` -> `NpvRequest`.
fn short_type_name(full: &str) -> String {
    full.rsplit("::").next().unwrap_or(full).to_string()
}
