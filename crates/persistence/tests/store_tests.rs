//! Chat, appointment, form, alert and digest stores across every backend.

#[macro_use]
mod common;

use std::collections::BTreeMap;

use carebridge_persistence::types::{
    AppointmentStatus, ChatRole, NewChatMessage, NewHealthDigest, NewPrefilledForm,
};
use carebridge_persistence::{
    AlertStore, AppStorage, AppointmentStore, ChatStore, DigestStore, FormStore,
};

use common::{at, checkup, intake_template, reminder};

// ============================================================================
// Chat Tests
// ============================================================================

fn message(session_id: Option<&str>, role: ChatRole, content: &str) -> NewChatMessage {
    NewChatMessage {
        session_id: session_id.map(str::to_string),
        role,
        content: content.to_string(),
    }
}

async fn check_chat_history_order<S: AppStorage>(storage: S) {
    storage
        .add_message(message(Some("s1"), ChatRole::User, "What is my A1c?"))
        .await
        .unwrap();
    storage
        .add_message(message(Some("s1"), ChatRole::Assistant, "It was 6.8%."))
        .await
        .unwrap();
    storage
        .add_message(message(None, ChatRole::User, "Hello"))
        .await
        .unwrap();

    let all = storage.list_messages(None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].content, "What is my A1c?");
    assert_eq!(all[1].role, ChatRole::Assistant);
    assert_eq!(all[2].content, "Hello");

    let s1 = storage.list_messages(Some("s1")).await.unwrap();
    assert_eq!(s1.len(), 2);
    assert!(s1.iter().all(|m| m.session_id.as_deref() == Some("s1")));
}

backend_test!(chat_history_order, check_chat_history_order);

async fn check_clear_messages<S: AppStorage>(storage: S) {
    storage
        .add_message(message(None, ChatRole::User, "one"))
        .await
        .unwrap();
    storage
        .add_message(message(None, ChatRole::Assistant, "two"))
        .await
        .unwrap();

    assert_eq!(storage.clear_messages().await.unwrap(), 2);
    assert!(storage.list_messages(None).await.unwrap().is_empty());
    assert_eq!(storage.clear_messages().await.unwrap(), 0);
}

backend_test!(clear_messages, check_clear_messages);

// ============================================================================
// Appointment Tests
// ============================================================================

async fn check_appointments_sorted_by_start<S: AppStorage>(storage: S) {
    let later = storage.create_appointment(checkup(at(20, 9))).await.unwrap();
    let sooner = storage.create_appointment(checkup(at(5, 14))).await.unwrap();

    assert_eq!(later.status, AppointmentStatus::Scheduled);

    let listed = storage.list_appointments().await.unwrap();
    let ids: Vec<_> = listed.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec![sooner.id.as_str(), later.id.as_str()]);
}

backend_test!(appointments_sorted_by_start, check_appointments_sorted_by_start);

async fn check_appointment_status_update<S: AppStorage>(storage: S) {
    let created = storage.create_appointment(checkup(at(10, 9))).await.unwrap();

    let updated = storage
        .update_appointment_status(&created.id, AppointmentStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(updated.status, AppointmentStatus::Cancelled);
    assert!(!updated.is_active());
    assert_eq!(updated.starts_at, created.starts_at);

    let read = storage.get_appointment(&created.id).await.unwrap().unwrap();
    assert_eq!(read, updated);

    let err = storage
        .update_appointment_status("missing", AppointmentStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

backend_test!(appointment_status_update, check_appointment_status_update);

async fn check_delete_appointment<S: AppStorage>(storage: S) {
    let created = storage.create_appointment(checkup(at(10, 9))).await.unwrap();

    storage.delete_appointment(&created.id).await.unwrap();
    assert!(storage.get_appointment(&created.id).await.unwrap().is_none());
    assert!(
        storage
            .delete_appointment(&created.id)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

backend_test!(delete_appointment, check_delete_appointment);

// ============================================================================
// Form Tests
// ============================================================================

async fn check_template_round_trip<S: AppStorage>(storage: S) {
    let created = storage.create_template(intake_template()).await.unwrap();
    assert_eq!(created.fields.len(), 3);

    let read = storage.get_template(&created.id).await.unwrap().unwrap();
    assert_eq!(read, created);
    assert_eq!(storage.list_templates().await.unwrap(), vec![created]);
}

backend_test!(template_round_trip, check_template_round_trip);

async fn check_save_prefilled<S: AppStorage>(storage: S) {
    let template = storage.create_template(intake_template()).await.unwrap();

    let first = storage
        .save_prefilled(NewPrefilledForm {
            template_id: template.id.clone(),
            appointment_id: None,
            values: BTreeMap::from([("name".to_string(), "Jordan Rivera".to_string())]),
            missing_fields: vec!["allergies".to_string()],
        })
        .await
        .unwrap();
    let second = storage
        .save_prefilled(NewPrefilledForm {
            template_id: template.id.clone(),
            appointment_id: Some("appt-1".to_string()),
            values: BTreeMap::new(),
            missing_fields: vec![],
        })
        .await
        .unwrap();

    assert_eq!(first.values["name"], "Jordan Rivera");
    assert_eq!(first.missing_fields, vec!["allergies"]);

    let listed = storage.list_prefilled().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1], first);
}

backend_test!(save_prefilled, check_save_prefilled);

async fn check_prefilled_requires_template<S: AppStorage>(storage: S) {
    let err = storage
        .save_prefilled(NewPrefilledForm {
            template_id: "missing".to_string(),
            appointment_id: None,
            values: BTreeMap::new(),
            missing_fields: vec![],
        })
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

backend_test!(prefilled_requires_template, check_prefilled_requires_template);

// ============================================================================
// Alert Tests
// ============================================================================

async fn check_alert_lifecycle<S: AppStorage>(storage: S) {
    let first = storage.create_alert(reminder("appointment-reminder:a1")).await.unwrap();
    let second = storage.create_alert(reminder("appointment-reminder:a2")).await.unwrap();
    assert!(!first.read);

    let all = storage.list_alerts(false).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, second.id);

    let read = storage.mark_alert_read(&first.id).await.unwrap();
    assert!(read.read);

    let unread = storage.list_alerts(true).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].id, second.id);

    storage.delete_alert(&second.id).await.unwrap();
    assert!(storage.list_alerts(true).await.unwrap().is_empty());
    assert!(storage.delete_alert(&second.id).await.unwrap_err().is_not_found());
    assert!(
        storage
            .mark_alert_read("missing")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

backend_test!(alert_lifecycle, check_alert_lifecycle);

async fn check_alert_dedup_key<S: AppStorage>(storage: S) {
    assert!(!storage.alert_exists("appointment-reminder:a1").await.unwrap());

    let alert = storage.create_alert(reminder("appointment-reminder:a1")).await.unwrap();
    assert!(storage.alert_exists("appointment-reminder:a1").await.unwrap());
    assert!(!storage.alert_exists("appointment-reminder:a2").await.unwrap());

    // Reading an alert keeps its key claimed.
    storage.mark_alert_read(&alert.id).await.unwrap();
    assert!(storage.alert_exists("appointment-reminder:a1").await.unwrap());
}

backend_test!(alert_dedup_key, check_alert_dedup_key);

// ============================================================================
// Digest Tests
// ============================================================================

async fn check_digests<S: AppStorage>(storage: S) {
    assert!(storage.latest_digest().await.unwrap().is_none());

    let older = storage
        .create_digest(NewHealthDigest {
            period_start: at(1, 0),
            period_end: at(8, 0),
            summary: "Quiet week.".to_string(),
            highlights: vec![],
        })
        .await
        .unwrap();
    let newer = storage
        .create_digest(NewHealthDigest {
            period_start: at(8, 0),
            period_end: at(15, 0),
            summary: "One new lab result.".to_string(),
            highlights: vec!["Hemoglobin A1c: 6.8 %".to_string()],
        })
        .await
        .unwrap();

    assert_eq!(newer.highlights, vec!["Hemoglobin A1c: 6.8 %"]);
    assert_eq!(newer.period_start, at(8, 0));

    let latest = storage.latest_digest().await.unwrap().unwrap();
    assert_eq!(latest, newer);

    let listed = storage.list_digests().await.unwrap();
    assert_eq!(listed, vec![newer, older]);
}

backend_test!(digests, check_digests);

async fn check_backend_name<S: AppStorage>(storage: S) {
    assert!(["memory", "sqlite"].contains(&storage.backend_name()));
}

backend_test!(backend_name, check_backend_name);
