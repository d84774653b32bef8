//! HTTP router exposing the dispatch facade.

use crate::auth::{ApiKey, require_api_key};
use crate::executor::dispatch::Dispatcher;
use crate::executor::handlers::{
    handle_get_job, handle_health, handle_invoke, handle_list_udfs, handle_submit_job,
};
use crate::executor::protocol::{ENDPOINT_HEALTH, ENDPOINT_JOBS, ENDPOINT_UDF_INVOKE, ENDPOINT_UDF_LIST};

use axum::routing::{get, post};
use axum::{Extension, Router, middleware};
use std::sync::Arc;

/// `/health` is open; every function and job route requires the API key.
pub fn build_router(dispatcher: Arc<Dispatcher>, api_key: ApiKey) -> Router {
    let protected = Router::new()
        .route(ENDPOINT_UDF_LIST, get(handle_list_udfs))
        .route(ENDPOINT_UDF_INVOKE, post(handle_invoke))
        .route(ENDPOINT_JOBS, get(handle_get_job).post(handle_submit_job))
        .route_layer(middleware::from_fn_with_state(api_key, require_api_key));

    Router::new()
        .route(ENDPOINT_HEALTH, get(handle_health))
        .merge(protected)
        .layer(Extension(dispatcher))
}
