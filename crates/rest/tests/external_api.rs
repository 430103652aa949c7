//! Third-party lookup API tests.
//!
//! The adapters point at a closed port, so every well-formed lookup must
//! come back as a degraded `200 OK` rather than an error.

mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::assertions::{assert_degraded, issue_fields};
use common::harness::TestApp;

#[tokio::test]
async fn test_trial_search_degrades() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/external/clinical-trials")
        .add_query_param("condition", "type 2 diabetes")
        .add_query_param("status", "RECRUITING")
        .await;

    response.assert_status_ok();
    assert_degraded(&response.json());
}

#[tokio::test]
async fn test_trial_search_needs_criteria() {
    let app = TestApp::new();

    let response = app.server.get("/api/external/clinical-trials").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(issue_fields(&response.json()), vec!["condition"]);
}

#[tokio::test]
async fn test_bad_nct_id_is_400() {
    let app = TestApp::new();

    let response = app.server.get("/api/external/clinical-trials/12345").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(issue_fields(&response.json()), vec!["nctId"]);
}

#[tokio::test]
async fn test_trial_lookup_degrades() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/external/clinical-trials/NCT01234567")
        .await;

    response.assert_status_ok();
    assert_degraded(&response.json());
}

#[tokio::test]
async fn test_drug_search() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/external/drugs/search")
        .add_query_param("name", "metformin")
        .await;
    response.assert_status_ok();
    assert_degraded(&response.json());

    let response = app.server.get("/api/external/drugs/search").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(issue_fields(&response.json()), vec!["name"]);
}

#[tokio::test]
async fn test_interactions_need_two_drugs() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/external/drugs/interactions")
        .json(&json!({ "drugs": ["warfarin", " Warfarin "] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(issue_fields(&response.json()), vec!["drugs"]);
}

#[tokio::test]
async fn test_interactions_degrade() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/external/drugs/interactions")
        .json(&json!({ "drugs": ["warfarin", "aspirin"] }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_degraded(&body);
}

#[tokio::test]
async fn test_provider_search() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/external/providers/search")
        .add_query_param("lastName", "Okafor")
        .add_query_param("state", "IL")
        .await;
    response.assert_status_ok();
    assert_degraded(&response.json());

    let response = app
        .server
        .get("/api/external/providers/search")
        .add_query_param("city", "Springfield")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(issue_fields(&response.json()), vec!["lastName"]);
}

#[tokio::test]
async fn test_provider_lookup() {
    let app = TestApp::new();

    app.server
        .get("/api/external/providers/123")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = app.server.get("/api/external/providers/1234567893").await;
    response.assert_status_ok();
    assert_degraded(&response.json());
}
