//! Integration tests for the HTTP surface: auth, sync calls, job submission
//! and polling, and the error mapping.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, build_test_app, get, post_json};
use serde_json::json;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: GET /health is open
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_needs_no_key() {
    let app = build_test_app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"ok": true}));
}

// ---------------------------------------------------------------------------
// Test: protected routes reject missing or wrong keys
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_api_key_is_unauthorized() {
    let app = build_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/udf/npv")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"cashflows":[100.0],"rate":0.1}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn wrong_api_key_is_unauthorized() {
    let app = build_test_app();
    let request = Request::builder()
        .uri("/udf")
        .header("x-api-key", "not-the-key")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Test: GET /udf lists the catalogue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn catalogue_lists_registered_functions() {
    let app = build_test_app();

    let response = get(app, "/udf").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["count"], 3);
    let names: Vec<&str> = json["functions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["duration", "npv", "scenario"]);
    assert_eq!(json["functions"][2]["mode"], "async");
    assert_eq!(json["functions"][1]["request"], "NpvRequest");
}

// ---------------------------------------------------------------------------
// Test: sync function answers inline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sync_npv_returns_result() {
    let app = build_test_app();

    let response = post_json(
        app,
        "/udf/npv",
        json!({"cashflows": [100.0, 100.0], "rate": 0.0}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["npv"], 200.0);
    assert_eq!(json["per_period"], json!([100.0, 100.0]));
}

// ---------------------------------------------------------------------------
// Test: async function returns a handle, then polls to done
// ---------------------------------------------------------------------------

#[tokio::test]
async fn async_scenario_submits_and_completes() {
    let app = build_test_app();

    let response = post_json(
        app.clone(),
        "/jobs/scenario",
        json!({"cashflows": [-100.0, 60.0, 60.0], "rate": 0.05, "n_sims": 200}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let handle = body_json(response).await;
    assert_eq!(handle["status"], "queued");
    let job_id = handle["job_id"].as_str().unwrap().to_string();

    let mut last = json!(null);
    for _ in 0..200 {
        let response = get(app.clone(), &format!("/jobs/{}", job_id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        last = body_json(response).await;
        if last["status"] == "done" || last["status"] == "error" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(last["status"], "done");
    assert_eq!(last["job_id"], job_id.as_str());
    assert!(last["result"]["npv_mean"].is_number());
    assert!(last.get("error").is_none());
}

#[tokio::test]
async fn async_function_through_invoke_route_is_accepted() {
    let app = build_test_app();

    let response = post_json(
        app,
        "/udf/scenario",
        json!({"cashflows": [100.0], "rate": 0.05, "n_sims": 10}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

// ---------------------------------------------------------------------------
// Test: error mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_function_is_404() {
    let app = build_test_app();

    let response = post_json(app, "/udf/nonexistent", json!({})).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn sync_function_has_no_job_route() {
    let app = build_test_app();

    let response = post_json(app, "/jobs/npv", json!({"cashflows": [1.0], "rate": 0.0})).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "function 'npv' is sync; invoke it via /udf/npv");
}

#[tokio::test]
async fn unknown_job_is_404() {
    let app = build_test_app();

    let response = get(app, "/jobs/bogus-id").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_input_is_422_with_fields() {
    let app = build_test_app();

    let response = post_json(app, "/udf/npv", json!({"cashflows": [], "rate": 0.05})).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["fields"][0]["field"], "cashflows");
}

#[tokio::test]
async fn malformed_json_body_is_422_with_fields() {
    let app = build_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/udf/npv")
        .header("x-api-key", common::TEST_API_KEY)
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["fields"][0]["field"], "body");
}

#[tokio::test]
async fn missing_content_type_is_422_with_fields() {
    let app = build_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/jobs/scenario")
        .header("x-api-key", common::TEST_API_KEY)
        .body(Body::from(r#"{"cashflows":[100.0],"rate":0.1}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["fields"][0]["field"], "body");
}

#[tokio::test]
async fn unknown_function_wins_over_unreadable_body() {
    let app = build_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/udf/nonexistent")
        .header("x-api-key", common::TEST_API_KEY)
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
