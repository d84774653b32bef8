#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, header::CONTENT_TYPE};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use udfkit::auth::{API_KEY_HEADER, ApiKey};
use udfkit::executor::dispatch::Dispatcher;
use udfkit::executor::executor::{Executor, ExecutorConfig};
use udfkit::executor::registry::RegistryBuilder;
use udfkit::executor::store::JobStore;
use udfkit::{server, udfs};

pub const TEST_API_KEY: &str = "test-key";

/// Builds the production router over the financial functions. Must be called
/// inside a tokio runtime.
pub fn build_test_app() -> Router {
    let mut builder = RegistryBuilder::new();
    udfs::register_all(&mut builder).unwrap();

    let jobs = JobStore::new();
    let executor = Executor::start(
        jobs.clone(),
        ExecutorConfig {
            workers: 2,
            queue_depth: 8,
            handler_timeout: None,
        },
    );
    let dispatcher = Arc::new(Dispatcher::new(builder.build(), jobs, executor));

    server::build_router(dispatcher, ApiKey::new(TEST_API_KEY))
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(API_KEY_HEADER, TEST_API_KEY)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(API_KEY_HEADER, TEST_API_KEY)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
