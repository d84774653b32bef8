use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::executor::contract::FieldError;

/// Errors surfaced by the registration phase and the dispatch facade.
///
/// `DuplicateRegistration` is a startup error and aborts initialization. Every
/// other variant is recovered at the facade boundary and returned to the caller.
#[derive(Debug, thiserror::Error)]
pub enum UdfError {
    #[error("function '{0}' is already registered")]
    DuplicateRegistration(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("job not found: {0}")]
    UnknownJob(String),

    /// A sync function was submitted as a job.
    #[error("function '{0}' is sync; invoke it via /udf/{0}")]
    NotAJob(String),

    /// Raw input did not satisfy the request contract.
    #[error("invalid request for '{function}': {}", summarize_fields(.fields))]
    Validation {
        function: String,
        fields: Vec<FieldError>,
    },

    /// The handler itself failed. Only the message is kept.
    #[error("handler '{function}' failed: {message}")]
    Handler { function: String, message: String },

    /// The async pool is at capacity; the caller should retry later.
    #[error("worker pool saturated ({capacity} jobs in flight)")]
    Overloaded { capacity: usize },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias for facade return values.
pub type UdfResult<T> = Result<T, UdfError>;

fn summarize_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl IntoResponse for UdfError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            UdfError::UnknownFunction(_) | UdfError::UnknownJob(_) | UdfError::NotAJob(_) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            UdfError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            UdfError::Handler { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "HANDLER_ERROR"),
            UdfError::Overloaded { .. } => (StatusCode::SERVICE_UNAVAILABLE, "OVERLOADED"),
            UdfError::DuplicateRegistration(_) | UdfError::Internal(_) => {
                tracing::error!(error = %self, "Internal error");
                let body = json!({
                    "error": "An internal error occurred",
                    "code": "INTERNAL_ERROR",
                });
                return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response();
            }
        };

        let body = match &self {
            UdfError::Validation { fields, .. } => json!({
                "error": self.to_string(),
                "code": code,
                "fields": fields,
            }),
            _ => json!({
                "error": self.to_string(),
                "code": code,
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn into_parts(err: UdfError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_overloaded_maps_to_503() {
        let (status, body) = into_parts(UdfError::Overloaded { capacity: 4 }).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "OVERLOADED");
        assert!(body["error"].as_str().unwrap().contains('4'));
    }

    #[tokio::test]
    async fn test_handler_error_keeps_its_message() {
        let err = UdfError::Handler {
            function: "npv".to_string(),
            message: "division by zero".to_string(),
        };

        let (status, body) = into_parts(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "HANDLER_ERROR");
        assert_eq!(body["error"], "handler 'npv' failed: division by zero");
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let (status, body) = into_parts(UdfError::Internal("secret".to_string())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn test_validation_error_lists_fields() {
        let err = UdfError::Validation {
            function: "npv".to_string(),
            fields: vec![FieldError::new("rate", "must be greater than -1")],
        };

        let (status, body) = into_parts(err).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["fields"][0]["field"], "rate");
    }

    #[tokio::test]
    async fn test_sync_function_job_submission_is_404() {
        let (status, body) = into_parts(UdfError::NotAJob("npv".to_string())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["error"], "function 'npv' is sync; invoke it via /udf/npv");
    }
}
