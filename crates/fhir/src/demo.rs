//! Sample provider used by demo connections.
//!
//! A demo session talks to an in-process [`MemoryGateway`] seeded with one
//! synthetic patient and a small record, so the whole flow (browse, chat,
//! migrate) works without a real provider.

use serde_json::{Value, json};

use crate::memory::MemoryGateway;

/// Provider identifier that selects the demo gateway.
pub const DEMO_PROVIDER: &str = "demo";

/// Base URL recorded on demo sessions.
pub const DEMO_SERVER_URL: &str = "demo://carebridge";

/// Patient id of the synthetic patient.
pub const DEMO_PATIENT_ID: &str = "demo-patient-1";

fn subject() -> Value {
    json!({ "reference": format!("Patient/{}", DEMO_PATIENT_ID) })
}

/// Resources making up the demo record.
pub fn demo_resources() -> Vec<Value> {
    vec![
        json!({
            "resourceType": "Patient",
            "id": DEMO_PATIENT_ID,
            "name": [{"given": ["Jordan"], "family": "Rivera"}],
            "gender": "female",
            "birthDate": "1978-04-12",
            "telecom": [{"system": "phone", "value": "555-0142"}],
            "address": [{"line": ["12 Orchard Lane"], "city": "Springfield", "state": "IL", "postalCode": "62701"}]
        }),
        json!({
            "resourceType": "Condition",
            "id": "demo-condition-1",
            "subject": subject(),
            "clinicalStatus": {"coding": [{"code": "active"}]},
            "code": {"coding": [{"system": "http://snomed.info/sct", "code": "44054006", "display": "Type 2 diabetes mellitus"}]},
            "onsetDateTime": "2015-09-01"
        }),
        json!({
            "resourceType": "Condition",
            "id": "demo-condition-2",
            "subject": subject(),
            "clinicalStatus": {"coding": [{"code": "active"}]},
            "code": {"text": "Essential hypertension"},
            "onsetDateTime": "2018-02-14"
        }),
        json!({
            "resourceType": "Observation",
            "id": "demo-observation-1",
            "subject": subject(),
            "status": "final",
            "code": {"coding": [{"system": "http://loinc.org", "code": "4548-4", "display": "Hemoglobin A1c"}]},
            "valueQuantity": {"value": 7.2, "unit": "%"},
            "effectiveDateTime": "2026-08-03"
        }),
        json!({
            "resourceType": "Observation",
            "id": "demo-observation-2",
            "subject": subject(),
            "status": "final",
            "code": {"text": "Systolic blood pressure"},
            "valueQuantity": {"value": 138, "unit": "mmHg"},
            "effectiveDateTime": "2026-08-03"
        }),
        json!({
            "resourceType": "MedicationRequest",
            "id": "demo-medication-1",
            "subject": subject(),
            "status": "active",
            "medicationCodeableConcept": {"text": "Metformin 500 mg tablet"},
            "dosageInstruction": [{"text": "Take one tablet twice daily with meals"}]
        }),
        json!({
            "resourceType": "MedicationRequest",
            "id": "demo-medication-2",
            "subject": subject(),
            "status": "active",
            "medicationCodeableConcept": {"text": "Lisinopril 10 mg tablet"},
            "dosageInstruction": [{"text": "Take one tablet daily"}]
        }),
        json!({
            "resourceType": "AllergyIntolerance",
            "id": "demo-allergy-1",
            "patient": subject(),
            "code": {"text": "Penicillin"},
            "criticality": "high",
            "reaction": [{"manifestation": [{"text": "Hives"}], "severity": "moderate"}]
        }),
        json!({
            "resourceType": "Immunization",
            "id": "demo-immunization-1",
            "patient": subject(),
            "status": "completed",
            "vaccineCode": {"text": "Influenza, seasonal"},
            "occurrenceDateTime": "2025-10-20"
        }),
        json!({
            "resourceType": "Coverage",
            "id": "demo-coverage-1",
            "beneficiary": subject(),
            "status": "active",
            "type": {"text": "PPO"},
            "payor": [{"display": "Prairie Health Plan"}]
        }),
    ]
}

/// A gateway holding the demo record.
pub fn demo_gateway() -> MemoryGateway {
    let gateway = MemoryGateway::new(DEMO_SERVER_URL);
    for resource in demo_resources() {
        gateway.seed(resource);
    }
    gateway
}
