//! Provider session and provider data API tests.
//!
//! Covers connecting and ending sessions, reading the connected patient's
//! record through the proxy endpoints, and migrating it to the local store.

mod common;

use axum::http::StatusCode;
use carebridge_fhir::demo::{DEMO_PATIENT_ID, DEMO_SERVER_URL};
use carebridge_fhir::{MemoryGateway, ResourceType};
use carebridge_persistence::SessionStore;
use serde_json::{Value, json};

use common::assertions::{assert_no_session, assert_outcome, issue_fields};
use common::harness::TestApp;

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_reports_backend() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "memory");
    assert_eq!(body["assistant"], true);
}

// =============================================================================
// Sessions
// =============================================================================

mod sessions {
    use super::*;

    #[tokio::test]
    async fn test_no_current_session_is_401() {
        let app = TestApp::new();
        assert_no_session(&app.server.get("/api/fhir/sessions/current").await);
        assert_no_session(&app.server.get("/api/fhir/bundle").await);
        assert_no_session(&app.server.post("/api/fhir/sessions/current/migrate").await);
    }

    #[tokio::test]
    async fn test_connect_demo() {
        let app = TestApp::new();

        let session = app.connect_demo().await;

        assert_eq!(session["provider"], "demo");
        assert_eq!(session["fhirServerUrl"], DEMO_SERVER_URL);
        assert_eq!(session["patientId"], DEMO_PATIENT_ID);
        assert_eq!(session["isCurrent"], true);
        assert_eq!(session["migrated"], false);
        assert!(session.get("accessToken").is_none());
        assert!(session.get("refreshToken").is_none());

        let current: Value = app.server.get("/api/fhir/sessions/current").await.json();
        assert_eq!(current["id"], session["id"]);
    }

    #[tokio::test]
    async fn test_connect_replaces_current_session() {
        let app = TestApp::new();
        let first = app.connect_demo().await;
        let second = app.connect_demo().await;

        let sessions: Vec<Value> = app.server.get("/api/fhir/sessions").await.json();
        assert_eq!(sessions.len(), 2);
        let current: Vec<_> = sessions.iter().filter(|s| s["isCurrent"] == true).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0]["id"], second["id"]);

        let previous = sessions.iter().find(|s| s["id"] == first["id"]).unwrap();
        assert!(previous["endedAt"].is_string());
    }

    #[tokio::test]
    async fn test_connect_reports_every_invalid_field() {
        let app = TestApp::new();

        let response = app
            .server
            .post("/api/fhir/sessions")
            .json(&json!({ "provider": "epic", "fhirServerUrl": "not a url" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_outcome(&body, "invalid");
        assert_eq!(
            issue_fields(&body),
            vec!["accessToken", "fhirServerUrl", "patientId"]
        );
    }

    #[tokio::test]
    async fn test_connect_rejects_out_of_range_expiry() {
        let app = TestApp::new();

        let response = app
            .server
            .post("/api/fhir/sessions")
            .json(&json!({ "provider": "demo", "expiresIn": 9_000_000_000_000_000_i64 }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_outcome(&body, "invalid");
        assert_eq!(issue_fields(&body), vec!["expiresIn"]);
        assert!(app.storage.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connect_real_provider() {
        let app = TestApp::new();

        let response = app
            .server
            .post("/api/fhir/sessions")
            .json(&json!({
                "provider": "epic",
                "accessToken": "secret-token",
                "expiresIn": 3600,
                "fhirServerUrl": "https://fhir.example.org/r4",
                "patientId": "erXuFYUfucBZaryVksYEcMg3"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert!(body["tokenExpiresAt"].is_string());
        assert!(!response.text().contains("secret-token"));

        let stored = app.storage.current_session().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "secret-token");
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let app = TestApp::new();

        let response = app
            .server
            .post("/api/fhir/sessions")
            .content_type("application/json")
            .text("{not json")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_outcome(&response.json(), "invalid");
    }

    #[tokio::test]
    async fn test_end_current_session() {
        let app = TestApp::new();
        app.connect_demo().await;

        let response = app.server.delete("/api/fhir/sessions/current").await;
        response.assert_status_ok();
        let ended: Value = response.json();
        assert_eq!(ended["isCurrent"], false);
        assert!(ended["endedAt"].is_string());

        assert_no_session(&app.server.get("/api/fhir/sessions/current").await);
    }

    #[tokio::test]
    async fn test_end_unknown_session_is_404() {
        let app = TestApp::new();

        let response = app.server.delete("/api/fhir/sessions/no-such-session").await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_outcome(&response.json(), "not-found");
    }
}

// =============================================================================
// Provider data
// =============================================================================

mod provider_data {
    use super::*;

    #[tokio::test]
    async fn test_bundle() {
        let app = TestApp::new();
        app.connect_demo().await;

        let response = app.server.get("/api/fhir/bundle").await;

        response.assert_status_ok();
        let bundle: Value = response.json();
        assert_eq!(bundle["patient"]["id"], DEMO_PATIENT_ID);
        assert_eq!(bundle["conditions"].as_array().unwrap().len(), 2);
        assert_eq!(bundle["medications"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_is_scoped_to_patient() {
        let app = TestApp::new();
        app.connect_demo().await;

        let response = app.server.get("/api/fhir/Condition").await;

        response.assert_status_ok();
        let bundle: Value = response.json();
        assert_eq!(bundle["resourceType"], "Bundle");
        assert_eq!(bundle["type"], "searchset");
        assert_eq!(bundle["total"], 2);
    }

    #[tokio::test]
    async fn test_read() {
        let app = TestApp::new();
        app.connect_demo().await;

        let response = app.server.get("/api/fhir/Observation/demo-observation-1").await;

        response.assert_status_ok();
        let observation: Value = response.json();
        assert_eq!(observation["resourceType"], "Observation");
        assert_eq!(observation["id"], "demo-observation-1");
    }

    #[tokio::test]
    async fn test_read_missing_is_404() {
        let app = TestApp::new();
        app.connect_demo().await;

        let response = app.server.get("/api/fhir/Observation/nope").await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_outcome(&response.json(), "not-found");
    }

    #[tokio::test]
    async fn test_unknown_type_is_400() {
        let app = TestApp::new();
        app.connect_demo().await;

        let response = app.server.get("/api/fhir/Starship").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(issue_fields(&response.json()), vec!["resourceType"]);
    }
}

// =============================================================================
// Migration
// =============================================================================

mod migration {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use carebridge_fhir::{FhirGateway, FhirResult};
    use common::harness::test_config;

    /// Local store that takes a while to accept each new resource.
    struct SlowGateway {
        inner: Arc<MemoryGateway>,
        delay: Duration,
    }

    #[async_trait]
    impl FhirGateway for SlowGateway {
        fn base_url(&self) -> &str {
            self.inner.base_url()
        }

        async fn create(&self, resource_type: ResourceType, resource: Value) -> FhirResult<Value> {
            tokio::time::sleep(self.delay).await;
            self.inner.create(resource_type, resource).await
        }

        async fn get(&self, resource_type: ResourceType, id: &str) -> FhirResult<Value> {
            self.inner.get(resource_type, id).await
        }

        async fn search(
            &self,
            resource_type: ResourceType,
            params: &[(String, String)],
            token: Option<&str>,
        ) -> FhirResult<Vec<Value>> {
            self.inner.search(resource_type, params, token).await
        }

        async fn update(
            &self,
            resource_type: ResourceType,
            id: &str,
            resource: Value,
        ) -> FhirResult<Value> {
            self.inner.update(resource_type, id, resource).await
        }

        async fn delete(&self, resource_type: ResourceType, id: &str) -> FhirResult<()> {
            self.inner.delete(resource_type, id).await
        }
    }

    #[tokio::test]
    async fn test_migrate_copies_record() {
        let app = TestApp::new();
        app.connect_demo().await;

        let response = app.server.post("/api/fhir/sessions/current/migrate").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 9);
        assert_eq!(body["counts"]["Condition"], 2);
        assert_eq!(body["counts"]["Coverage"], 1);
        assert!(body["counts"].get("Patient").is_none());
        assert_eq!(body["session"]["migrated"], true);
        assert!(body["session"]["migratedAt"].is_string());

        assert_eq!(app.local_fhir.count(ResourceType::Patient), 1);
        assert_eq!(app.local_fhir.count(ResourceType::Condition), 2);

        let local_patient = &app.local_fhir.all(ResourceType::Patient)[0];
        let local_id = local_patient["id"].as_str().unwrap();
        assert_ne!(local_id, DEMO_PATIENT_ID);
        for condition in app.local_fhir.all(ResourceType::Condition) {
            assert_eq!(
                condition["subject"]["reference"],
                format!("Patient/{}", local_id)
            );
        }
    }

    #[tokio::test]
    async fn test_failed_migration_leaves_session_unmigrated() {
        let app = TestApp::with_local_fhir(MemoryGateway::new("local").failing_on_create(3));
        app.connect_demo().await;

        let response = app.server.post("/api/fhir/sessions/current/migrate").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_outcome(&response.json(), "exception");

        let session = app.storage.current_session().await.unwrap().unwrap();
        assert!(!session.migrated);
        assert!(session.migration_counts.is_empty());
        assert_eq!(app.local_fhir.create_calls(), 3);
    }

    #[tokio::test]
    async fn test_migration_finishes_after_request_times_out() {
        let config = carebridge_rest::ServerConfig {
            request_timeout: 1,
            ..test_config()
        };
        let app = TestApp::with_wrapped_local_fhir(config, |inner| {
            Arc::new(SlowGateway {
                inner,
                delay: Duration::from_millis(250),
            })
        });
        app.connect_demo().await;

        let response = app.server.post("/api/fhir/sessions/current/migrate").await;
        response.assert_status(StatusCode::REQUEST_TIMEOUT);

        let mut migrated = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let session = app.storage.current_session().await.unwrap().unwrap();
            if session.migrated {
                migrated = true;
                break;
            }
        }

        assert!(migrated, "migration did not complete after the timeout");
        assert_eq!(app.local_fhir.count(ResourceType::Patient), 1);
        assert_eq!(app.local_fhir.create_calls(), 10);
        let session = app.storage.current_session().await.unwrap().unwrap();
        assert_eq!(session.migration_counts.values().sum::<u64>(), 9);
    }
}

// =============================================================================
// SQLite storage
// =============================================================================

mod sqlite_storage {
    use super::*;
    use axum_test::TestServer;
    use carebridge_persistence::backends::sqlite::SqliteBackend;
    use carebridge_rest::create_app_with_config;

    #[tokio::test]
    async fn test_sessions_survive_restart() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("carebridge.db");
        let config = common::harness::test_config();

        let backend = SqliteBackend::open(&path).expect("Failed to open database");
        backend.init_schema().expect("Failed to init schema");
        let app = create_app_with_config(backend, config.clone()).expect("Failed to build app");
        let server = TestServer::new(app).expect("Failed to create test server");

        let health: Value = server.get("/health").await.json();
        assert_eq!(health["backend"], "sqlite");
        server
            .post("/api/fhir/sessions")
            .json(&json!({ "provider": "demo" }))
            .await
            .assert_status(StatusCode::CREATED);
        drop(server);

        let backend = SqliteBackend::open(&path).expect("Failed to reopen database");
        backend.init_schema().expect("Failed to init schema");
        let app = create_app_with_config(backend, config).expect("Failed to build app");
        let server = TestServer::new(app).expect("Failed to create test server");

        let current: Value = server.get("/api/fhir/sessions/current").await.json();
        assert_eq!(current["provider"], "demo");
        assert_eq!(current["patientId"], DEMO_PATIENT_ID);
    }
}
