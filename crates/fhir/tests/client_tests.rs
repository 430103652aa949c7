//! FHIR HTTP client tests against a local mock server.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use carebridge_fhir::{FhirClient, FhirError, FhirGateway, ResourceType};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;

#[derive(Clone, Default)]
struct Recorded {
    authorization: Arc<Mutex<Vec<Option<String>>>>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn search(
    State(recorded): State<Recorded>,
    Path(resource_type): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    recorded.authorization.lock().push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    recorded.queries.lock().push(query);

    match resource_type.as_str() {
        "Condition" => (
            StatusCode::OK,
            Json(json!({
                "resourceType": "Bundle",
                "type": "searchset",
                "entry": [
                    {"resource": {"resourceType": "Condition", "id": "c1"}},
                    {"resource": {"resourceType": "Condition", "id": "c2"}}
                ]
            })),
        ),
        "Observation" => (StatusCode::OK, Json(json!({"entry": []}))),
        "Coverage" => (
            StatusCode::OK,
            Json(json!({"resourceType": "Coverage", "id": "cov1"})),
        ),
        "Claim" => (
            StatusCode::OK,
            Json(json!([{"resourceType": "Claim", "id": "cl1"}])),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"resourceType": "OperationOutcome"})),
        ),
    }
}

async fn create(Path(resource_type): Path<String>, Json(mut body): Json<Value>) -> (StatusCode, Json<Value>) {
    body["id"] = json!(format!("{}-new", resource_type.to_lowercase()));
    (StatusCode::CREATED, Json(body))
}

async fn read(Path((_resource_type, id)): Path<(String, String)>) -> (StatusCode, Json<Value>) {
    if id == "known" {
        (
            StatusCode::OK,
            Json(json!({"resourceType": "Patient", "id": "known"})),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"resourceType": "OperationOutcome"})),
        )
    }
}

async fn remove() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn start_server() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/fhir/{resource_type}", get(search).post(create))
        .route("/fhir/{resource_type}/{id}", get(read).delete(remove))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/fhir/", addr), recorded)
}

#[tokio::test]
async fn test_search_unwraps_bundle_entries() {
    let (base, _) = start_server().await;
    let client = FhirClient::new(&base).unwrap();

    let found = client
        .search(ResourceType::Condition, &[], None)
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[1]["id"], "c2");
}

#[tokio::test]
async fn test_search_shapes() {
    let (base, _) = start_server().await;
    let client = FhirClient::new(&base).unwrap();

    let empty = client
        .search(ResourceType::Observation, &[], None)
        .await
        .unwrap();
    assert!(empty.is_empty());

    let single = client
        .search(ResourceType::Coverage, &[], None)
        .await
        .unwrap();
    assert_eq!(single.len(), 1);

    let array = client.search(ResourceType::Claim, &[], None).await.unwrap();
    assert_eq!(array.len(), 1);
}

#[tokio::test]
async fn test_search_sends_params_and_token() {
    let (base, recorded) = start_server().await;
    let client = FhirClient::new(&base)
        .unwrap()
        .with_bearer_token("default-token");

    let params = vec![("patient".to_string(), "p1".to_string())];
    client
        .search(ResourceType::Condition, &params, None)
        .await
        .unwrap();
    client
        .search(ResourceType::Condition, &params, Some("override"))
        .await
        .unwrap();

    let auth = recorded.authorization.lock().clone();
    assert_eq!(auth[0].as_deref(), Some("Bearer default-token"));
    assert_eq!(auth[1].as_deref(), Some("Bearer override"));
    assert_eq!(
        recorded.queries.lock()[0].get("patient").map(String::as_str),
        Some("p1")
    );
}

#[tokio::test]
async fn test_create_and_get() {
    let (base, _) = start_server().await;
    let client = FhirClient::new(&base).unwrap();

    let created = client
        .create(
            ResourceType::Patient,
            json!({"resourceType": "Patient", "name": [{"family": "Rivera"}]}),
        )
        .await
        .unwrap();
    assert_eq!(created["id"], "patient-new");

    let read = client.get(ResourceType::Patient, "known").await.unwrap();
    assert_eq!(read["id"], "known");
}

#[tokio::test]
async fn test_errors_propagate() {
    let (base, _) = start_server().await;
    let client = FhirClient::new(&base).unwrap();

    let err = client
        .get(ResourceType::Patient, "missing")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = client
        .search(ResourceType::Immunization, &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, FhirError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_delete_accepts_empty_body() {
    let (base, _) = start_server().await;
    let client = FhirClient::new(&base).unwrap();
    client.delete(ResourceType::Condition, "c1").await.unwrap();
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Port 9 (discard) on localhost is expected to refuse connections.
    let client = FhirClient::new("http://127.0.0.1:9/fhir").unwrap();
    let err = client
        .get(ResourceType::Patient, "p1")
        .await
        .unwrap_err();
    assert!(matches!(err, FhirError::Transport(_)));
}
