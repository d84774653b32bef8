//! API key check gating every function and job route.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::sync::Arc;

pub const API_KEY_HEADER: &str = "x-api-key";

/// The shared secret callers must present in the `x-api-key` header.
#[derive(Clone)]
pub struct ApiKey(Arc<str>);

impl ApiKey {
    pub fn new(key: &str) -> Self {
        Self(Arc::from(key))
    }

    pub fn verify(&self, presented: Option<&str>) -> bool {
        match presented {
            Some(candidate) if !candidate.is_empty() => {
                constant_time_eq(candidate.as_bytes(), self.0.as_bytes())
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug)]
pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        let body = json!({
            "error": "Invalid or missing API key",
            "code": "UNAUTHORIZED",
        });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

/// Middleware rejecting requests without the configured key.
pub async fn require_api_key(
    State(key): State<ApiKey>,
    request: Request,
    next: Next,
) -> Result<Response, Unauthorized> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if !key.verify(presented) {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid API key");
        return Err(Unauthorized);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_requires_exact_match() {
        let key = ApiKey::new("secret123");
        assert!(key.verify(Some("secret123")));
        assert!(!key.verify(Some("secret124")));
        assert!(!key.verify(Some("secret")));
        assert!(!key.verify(Some("")));
        assert!(!key.verify(None));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = ApiKey::new("secret123");
        assert!(!format!("{:?}", key).contains("secret123"));
    }
}
