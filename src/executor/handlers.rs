use super::contract::FieldError;
use super::dispatch::{Dispatcher, Invocation};
use super::protocol::*;
use super::types::ExecutionMode;
use crate::error::{UdfError, UdfResult};

use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, extract::Path, http::StatusCode};
use serde_json::Value;
use std::sync::Arc;

pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

pub async fn handle_list_udfs(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
) -> Json<UdfListResponse> {
    let functions: Vec<UdfDescriptor> = dispatcher
        .registry()
        .records()
        .into_iter()
        .map(UdfDescriptor::from)
        .collect();

    Json(UdfListResponse {
        count: functions.len(),
        functions,
    })
}

/// Invokes any registered function: 200 with the response for sync functions,
/// 202 with a job handle for async ones.
pub async fn handle_invoke(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Path(name): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> UdfResult<Response> {
    dispatcher.registry().lookup(&name)?;
    let body = request_body(&name, payload)?;
    invoke_blocking(dispatcher, name, body).await
}

/// Submits an async function. Sync functions have no job endpoint.
pub async fn handle_submit_job(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Path(name): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> UdfResult<Response> {
    let record = dispatcher.registry().lookup(&name)?;
    if record.mode != ExecutionMode::Async {
        tracing::debug!(udf = %name, "Job submission for a sync function");
        return Err(UdfError::NotAJob(name));
    }

    let body = request_body(&name, payload)?;
    invoke_blocking(dispatcher, name, body).await
}

pub async fn handle_get_job(
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    Path(job_id): Path<String>,
) -> UdfResult<Json<JobStatusResponse>> {
    let snapshot = dispatcher.poll(&job_id)?;
    tracing::debug!("Job status query: {} -> {}", job_id, snapshot.status);
    Ok(Json(JobStatusResponse::from(snapshot)))
}

/// A body that is not JSON (or lacks the JSON content type) fails the request
/// contract like any other malformed input.
fn request_body(name: &str, payload: Result<Json<Value>, JsonRejection>) -> UdfResult<Value> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            tracing::info!(udf = name, status = %rejection.status(), "Rejected unreadable body");
            Err(UdfError::Validation {
                function: name.to_string(),
                fields: vec![FieldError::new("body", rejection.body_text())],
            })
        }
    }
}

/// Sync handlers block, so the facade runs on the blocking pool rather than the reactor.
async fn invoke_blocking(
    dispatcher: Arc<Dispatcher>,
    name: String,
    body: Value,
) -> UdfResult<Response> {
    let invocation = tokio::task::spawn_blocking(move || dispatcher.invoke(&name, body))
        .await
        .map_err(|e| UdfError::Internal(format!("dispatch task failed: {}", e)))??;

    Ok(match invocation {
        Invocation::Completed(value) => (StatusCode::OK, Json(value)).into_response(),
        Invocation::Submitted(handle) => (StatusCode::ACCEPTED, Json(handle)).into_response(),
    })
}
