//! Migration service integration tests.
//!
//! Run the migration against in-memory destinations and check counts,
//! create-call accounting, failure semantics and reference rewriting.

use std::sync::Arc;

use carebridge_fhir::{
    MemoryGateway, MigrationError, MigrationService, ResourceBundle, ResourceType,
};
use serde_json::{Value, json};

fn source_patient() -> Value {
    json!({
        "resourceType": "Patient",
        "id": "source-patient",
        "meta": {"versionId": "7"},
        "name": [{"family": "Rivera"}]
    })
}

fn child(resource_type: &str, id: &str, field: &str) -> Value {
    json!({
        "resourceType": resource_type,
        "id": id,
        field: {"reference": "Patient/source-patient"}
    })
}

fn sample_bundle() -> ResourceBundle {
    ResourceBundle {
        patient: source_patient(),
        conditions: vec![
            child("Condition", "c1", "subject"),
            child("Condition", "c2", "subject"),
        ],
        observations: vec![
            child("Observation", "o1", "subject"),
            child("Observation", "o2", "subject"),
            child("Observation", "o3", "subject"),
        ],
        medications: vec![],
        allergies: vec![child("AllergyIntolerance", "a1", "patient")],
        immunizations: vec![],
        coverages: vec![child("Coverage", "cov1", "beneficiary")],
        claims: vec![child("Claim", "cl1", "patient")],
        explanations_of_benefit: vec![],
    }
}

#[tokio::test]
async fn test_counts_sum_to_bundle_total() {
    let destination = Arc::new(MemoryGateway::new("local"));
    let service = MigrationService::new(destination.clone());
    let bundle = sample_bundle();

    let counts = service
        .migrate_provider_data("session-1", &bundle.patient, &bundle)
        .await
        .expect("migration should succeed");

    assert_eq!(counts.total(), bundle.total() as u64);
    assert_eq!(counts.get(ResourceType::Condition), Some(2));
    assert_eq!(counts.get(ResourceType::Observation), Some(3));
    assert_eq!(counts.get(ResourceType::AllergyIntolerance), Some(1));
    assert_eq!(counts.get(ResourceType::Coverage), Some(1));
    assert_eq!(counts.get(ResourceType::Claim), Some(1));

    // Empty collections get no entry.
    assert_eq!(counts.get(ResourceType::MedicationRequest), None);
    assert_eq!(counts.get(ResourceType::Immunization), None);
    assert_eq!(counts.get(ResourceType::ExplanationOfBenefit), None);

    // One create per child plus the Patient.
    assert_eq!(destination.create_calls(), bundle.total() + 1);
    assert_eq!(destination.count(ResourceType::Patient), 1);
}

#[tokio::test]
async fn test_children_reference_destination_patient() {
    let destination = Arc::new(MemoryGateway::new("local"));
    let service = MigrationService::new(destination.clone());
    let bundle = sample_bundle();

    service
        .migrate_provider_data("session-1", &bundle.patient, &bundle)
        .await
        .unwrap();

    let patients = destination.all(ResourceType::Patient);
    let new_id = patients[0]["id"].as_str().unwrap().to_string();
    assert_ne!(new_id, "source-patient");
    let expected = format!("Patient/{}", new_id);

    for observation in destination.all(ResourceType::Observation) {
        assert_eq!(observation["subject"]["reference"], expected.as_str());
        assert_ne!(observation["id"], "o1");
    }
    for claim in destination.all(ResourceType::Claim) {
        assert_eq!(claim["patient"]["reference"], expected.as_str());
    }
    for coverage in destination.all(ResourceType::Coverage) {
        assert_eq!(coverage["beneficiary"]["reference"], expected.as_str());
    }
}

#[tokio::test]
async fn test_failure_mid_loop_rejects_without_counts() {
    // Create #1 is the Patient, #2 and #3 the conditions, #4 the first observation.
    let destination = Arc::new(MemoryGateway::new("local").failing_on_create(4));
    let service = MigrationService::new(destination.clone());
    let bundle = sample_bundle();

    let err = service
        .migrate_provider_data("session-1", &bundle.patient, &bundle)
        .await
        .expect_err("migration should abort");

    match err {
        MigrationError::Create {
            resource_type,
            index,
            ..
        } => {
            assert_eq!(resource_type, "Observation");
            assert_eq!(index, 0);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Earlier creates stay; nothing after the failure is attempted.
    assert_eq!(destination.create_calls(), 4);
    assert_eq!(destination.count(ResourceType::Patient), 1);
    assert_eq!(destination.count(ResourceType::Condition), 2);
    assert_eq!(destination.count(ResourceType::Observation), 0);
    assert_eq!(destination.count(ResourceType::Claim), 0);
}

#[tokio::test]
async fn test_patient_create_failure() {
    let destination = Arc::new(MemoryGateway::new("local").failing_on_create(1));
    let service = MigrationService::new(destination.clone());
    let bundle = sample_bundle();

    let err = service
        .migrate_provider_data("session-1", &bundle.patient, &bundle)
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::PatientCreate(_)));
    assert_eq!(destination.create_calls(), 1);
}

#[tokio::test]
async fn test_invalid_patient_is_rejected_before_any_create() {
    let destination = Arc::new(MemoryGateway::new("local"));
    let service = MigrationService::new(destination.clone());
    let bundle = sample_bundle();

    let not_a_patient = json!({"resourceType": "Practitioner", "id": "x"});
    let err = service
        .migrate_provider_data("session-1", &not_a_patient, &bundle)
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::InvalidPatient(_)));
    assert_eq!(destination.create_calls(), 0);
}

#[tokio::test]
async fn test_patient_only_bundle_yields_empty_counts() {
    let destination = Arc::new(MemoryGateway::new("local"));
    let service = MigrationService::new(destination.clone());
    let bundle = ResourceBundle::for_patient(source_patient());

    let counts = service
        .migrate_provider_data("session-1", &bundle.patient, &bundle)
        .await
        .unwrap();
    assert!(counts.is_empty());
    assert_eq!(destination.create_calls(), 1);
}

#[tokio::test]
async fn test_rerun_duplicates_resources() {
    let destination = Arc::new(MemoryGateway::new("local"));
    let service = MigrationService::new(destination.clone());
    let bundle = sample_bundle();

    service
        .migrate_provider_data("session-1", &bundle.patient, &bundle)
        .await
        .unwrap();
    service
        .migrate_provider_data("session-1", &bundle.patient, &bundle)
        .await
        .unwrap();

    assert_eq!(destination.count(ResourceType::Patient), 2);
    assert_eq!(destination.count(ResourceType::Observation), 6);
}
