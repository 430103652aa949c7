//! Shared test infrastructure for the persistence layer.
//!
//! [`backend_test!`] runs one async test body against every backend so the
//! memory and SQLite stores are held to the same behavior.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use carebridge_persistence::types::{
    AlertKind, AlertSeverity, FieldSource, FormField, NewAppointment, NewFhirSession,
    NewFormTemplate, NewHealthAlert,
};

/// Declares `memory_<name>` and `sqlite_<name>` tests running `$test_fn`.
///
/// `$test_fn` takes the backend by value and returns a future.
#[macro_export]
macro_rules! backend_test {
    ($test_name:ident, $test_fn:expr) => {
        paste::paste! {
            #[tokio::test]
            async fn [<memory_ $test_name>]() {
                let backend = carebridge_persistence::backends::memory::MemoryBackend::new();
                ($test_fn)(backend).await;
            }

            #[cfg(feature = "sqlite")]
            #[tokio::test]
            async fn [<sqlite_ $test_name>]() {
                use carebridge_persistence::backends::sqlite::SqliteBackend;

                let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
                backend.init_schema().expect("Failed to initialize schema");
                ($test_fn)(backend).await;
            }
        }
    };
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

pub fn epic_session() -> NewFhirSession {
    NewFhirSession {
        provider: "epic-sandbox".to_string(),
        access_token: "access-epic".to_string(),
        refresh_token: Some("refresh-epic".to_string()),
        token_expires_at: Some(Utc::now() + Duration::hours(1)),
        fhir_server_url: "https://fhir.epic.example/api/FHIR/R4".to_string(),
        patient_id: Some("erXuFYUfucBZaryVksYEcMg3".to_string()),
        scope: Some("patient/*.read".to_string()),
    }
}

pub fn demo_session() -> NewFhirSession {
    NewFhirSession {
        provider: "demo".to_string(),
        access_token: "demo-token".to_string(),
        fhir_server_url: "demo://local".to_string(),
        patient_id: Some("demo-patient".to_string()),
        ..Default::default()
    }
}

pub fn checkup(starts_at: DateTime<Utc>) -> NewAppointment {
    NewAppointment {
        title: "Annual checkup".to_string(),
        provider_name: Some("Dr. Amara Osei".to_string()),
        location: Some("Riverside Clinic".to_string()),
        starts_at,
        ends_at: Some(starts_at + Duration::minutes(30)),
        notes: None,
    }
}

pub fn intake_template() -> NewFormTemplate {
    NewFormTemplate {
        name: "New patient intake".to_string(),
        description: Some("General intake questionnaire".to_string()),
        fields: vec![
            FormField {
                key: "name".to_string(),
                label: "Full name".to_string(),
                source: FieldSource::PatientName,
            },
            FormField {
                key: "allergies".to_string(),
                label: "Known allergies".to_string(),
                source: FieldSource::Allergies,
            },
            FormField {
                key: "reason".to_string(),
                label: "Reason for visit".to_string(),
                source: FieldSource::FreeText,
            },
        ],
    }
}

pub fn reminder(dedup_key: &str) -> NewHealthAlert {
    NewHealthAlert {
        kind: AlertKind::AppointmentReminder,
        severity: AlertSeverity::Info,
        title: "Upcoming appointment".to_string(),
        message: "Annual checkup tomorrow at 9:00".to_string(),
        dedup_key: Some(dedup_key.to_string()),
    }
}
