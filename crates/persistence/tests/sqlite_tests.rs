//! SQLite file-mode integration tests.

#![cfg(feature = "sqlite")]

mod common;

use carebridge_persistence::backends::sqlite::{SqliteBackend, SqliteBackendConfig};
use carebridge_persistence::{AlertStore, AppointmentStore, SessionStore};

use common::{at, checkup, demo_session, epic_session, reminder};

fn open_backend(path: &std::path::Path) -> SqliteBackend {
    let backend = SqliteBackend::open(path).expect("Failed to open SQLite database");
    backend.init_schema().expect("Failed to initialize schema");
    backend
}

#[tokio::test]
async fn test_data_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("carebridge.db");

    let (session_id, appointment_id) = {
        let backend = open_backend(&path);
        assert!(!backend.is_memory());
        let session = backend.create_session(epic_session()).await.unwrap();
        let appointment = backend.create_appointment(checkup(at(12, 9))).await.unwrap();
        backend.create_alert(reminder("appointment-reminder:x")).await.unwrap();
        (session.id, appointment.id)
    };

    let backend = open_backend(&path);
    let current = backend.current_session().await.unwrap().unwrap();
    assert_eq!(current.id, session_id);
    assert_eq!(current.access_token, "access-epic");
    assert!(backend.get_appointment(&appointment_id).await.unwrap().is_some());
    assert!(backend.alert_exists("appointment-reminder:x").await.unwrap());
}

#[tokio::test]
async fn test_session_switch_in_file_mode() {
    let dir = tempfile::tempdir().unwrap();
    let backend = open_backend(&dir.path().join("sessions.db"));

    let first = backend.create_session(epic_session()).await.unwrap();
    let second = backend.create_session(demo_session()).await.unwrap();

    let sessions = backend.list_sessions().await.unwrap();
    assert_eq!(sessions.iter().filter(|s| s.is_current).count(), 1);
    assert_eq!(
        backend.current_session().await.unwrap().unwrap().id,
        second.id
    );
    assert!(
        backend
            .get_session(&first.id)
            .await
            .unwrap()
            .unwrap()
            .ended_at
            .is_some()
    );
}

#[tokio::test]
async fn test_concurrent_session_creation_keeps_one_current() {
    let dir = tempfile::tempdir().unwrap();
    let backend = std::sync::Arc::new(open_backend(&dir.path().join("race.db")));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let backend = backend.clone();
        handles.push(tokio::spawn(async move {
            backend.create_session(demo_session()).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let sessions = backend.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 8);
    assert_eq!(sessions.iter().filter(|s| s.is_current).count(), 1);
}

#[test]
fn test_schema_init_is_idempotent_on_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.db");

    open_backend(&path);
    let backend = open_backend(&path);
    backend.init_schema().unwrap();
}

#[test]
fn test_custom_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = SqliteBackendConfig {
        max_connections: 2,
        enable_wal: false,
        ..Default::default()
    };
    let backend = SqliteBackend::with_config(dir.path().join("custom.db"), config).unwrap();
    assert_eq!(backend.config().max_connections, 2);
    backend.init_schema().unwrap();
}
