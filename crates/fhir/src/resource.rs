//! FHIR resource type catalogue and loose-document helpers.
//!
//! Resources are exchanged as FHIR R4 JSON documents (`serde_json::Value`).
//! They are validated only superficially: the document must be an object
//! with a matching `resourceType`, and sometimes an `id`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FhirError, FhirResult};

/// Resource types exchanged with providers and the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    Patient,
    Condition,
    Observation,
    MedicationRequest,
    AllergyIntolerance,
    Immunization,
    Coverage,
    Claim,
    ExplanationOfBenefit,
    Practitioner,
    Organization,
    Location,
    Appointment,
    PractitionerRole,
}

impl ResourceType {
    /// Every supported type.
    pub const ALL: [ResourceType; 14] = [
        ResourceType::Patient,
        ResourceType::Condition,
        ResourceType::Observation,
        ResourceType::MedicationRequest,
        ResourceType::AllergyIntolerance,
        ResourceType::Immunization,
        ResourceType::Coverage,
        ResourceType::Claim,
        ResourceType::ExplanationOfBenefit,
        ResourceType::Practitioner,
        ResourceType::Organization,
        ResourceType::Location,
        ResourceType::Appointment,
        ResourceType::PractitionerRole,
    ];

    /// The FHIR type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Patient => "Patient",
            ResourceType::Condition => "Condition",
            ResourceType::Observation => "Observation",
            ResourceType::MedicationRequest => "MedicationRequest",
            ResourceType::AllergyIntolerance => "AllergyIntolerance",
            ResourceType::Immunization => "Immunization",
            ResourceType::Coverage => "Coverage",
            ResourceType::Claim => "Claim",
            ResourceType::ExplanationOfBenefit => "ExplanationOfBenefit",
            ResourceType::Practitioner => "Practitioner",
            ResourceType::Organization => "Organization",
            ResourceType::Location => "Location",
            ResourceType::Appointment => "Appointment",
            ResourceType::PractitionerRole => "PractitionerRole",
        }
    }

    /// The element that points a patient-compartment resource at its Patient.
    ///
    /// Returns `None` for types that are not linked to a single patient.
    pub fn patient_reference_field(&self) -> Option<&'static str> {
        match self {
            ResourceType::Condition
            | ResourceType::Observation
            | ResourceType::MedicationRequest => Some("subject"),
            ResourceType::AllergyIntolerance
            | ResourceType::Immunization
            | ResourceType::Claim
            | ResourceType::ExplanationOfBenefit => Some("patient"),
            ResourceType::Coverage => Some("beneficiary"),
            _ => None,
        }
    }

    /// Whether searches for this type are scoped to a patient.
    pub fn is_patient_compartment(&self) -> bool {
        self.patient_reference_field().is_some()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = FhirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FhirError::InvalidResource {
                resource_type: s.to_string(),
                message: "unsupported resource type".to_string(),
            })
    }
}

/// Checks that `resource` is an object whose `resourceType` is `expected`.
pub fn validate_resource(expected: ResourceType, resource: &Value) -> FhirResult<()> {
    let invalid = |message: &str| FhirError::InvalidResource {
        resource_type: expected.to_string(),
        message: message.to_string(),
    };

    let obj = resource
        .as_object()
        .ok_or_else(|| invalid("resource must be a JSON object"))?;

    match obj.get("resourceType").and_then(Value::as_str) {
        Some(t) if t == expected.as_str() => Ok(()),
        Some(t) => Err(invalid(&format!("unexpected resourceType '{}'", t))),
        None => Err(invalid("missing resourceType")),
    }
}

/// Like [`validate_resource`], but also requires a non-empty `id`.
pub fn validate_resource_with_id(expected: ResourceType, resource: &Value) -> FhirResult<()> {
    validate_resource(expected, resource)?;
    match resource_id(resource) {
        Some(_) => Ok(()),
        None => Err(FhirError::InvalidResource {
            resource_type: expected.to_string(),
            message: "missing id".to_string(),
        }),
    }
}

/// Returns the logical id of a resource, if it has a non-empty one.
pub fn resource_id(resource: &Value) -> Option<&str> {
    resource
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Best human-readable text of a CodeableConcept-like value.
///
/// Tries `text`, then the first `coding[].display`, then the first
/// `coding[].code`.
pub fn display_text(concept: &Value) -> Option<String> {
    if let Some(text) = concept.get("text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return Some(text.trim().to_string());
        }
    }

    let codings = concept.get("coding").and_then(Value::as_array)?;
    codings
        .iter()
        .find_map(|c| c.get("display").and_then(Value::as_str))
        .or_else(|| codings.iter().find_map(|c| c.get("code").and_then(Value::as_str)))
        .map(str::to_string)
}

/// Formats the first `HumanName` of a Patient or Practitioner.
pub fn human_name(resource: &Value) -> Option<String> {
    let name = resource.get("name")?.as_array()?.first()?;
    if let Some(text) = name.get("text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    let mut parts: Vec<&str> = name
        .get("given")
        .and_then(Value::as_array)
        .map(|given| given.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if let Some(family) = name.get("family").and_then(Value::as_str) {
        parts.push(family);
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Reference string (`Patient/<id>`) for a patient id.
pub fn patient_reference(patient_id: &str) -> String {
    format!("{}/{}", ResourceType::Patient, patient_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_names() {
        for t in ResourceType::ALL {
            assert_eq!(t.as_str().parse::<ResourceType>().unwrap(), t);
        }
        assert!("patient".parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_reference_fields() {
        assert_eq!(
            ResourceType::Observation.patient_reference_field(),
            Some("subject")
        );
        assert_eq!(
            ResourceType::Immunization.patient_reference_field(),
            Some("patient")
        );
        assert_eq!(
            ResourceType::Coverage.patient_reference_field(),
            Some("beneficiary")
        );
        assert_eq!(ResourceType::Practitioner.patient_reference_field(), None);
        assert!(!ResourceType::Patient.is_patient_compartment());
    }

    #[test]
    fn test_validate_resource() {
        let ok = json!({"resourceType": "Condition", "id": "c1"});
        assert!(validate_resource(ResourceType::Condition, &ok).is_ok());
        assert!(validate_resource_with_id(ResourceType::Condition, &ok).is_ok());

        let wrong = json!({"resourceType": "Observation"});
        assert!(validate_resource(ResourceType::Condition, &wrong).is_err());

        let missing = json!({"id": "c1"});
        assert!(validate_resource(ResourceType::Condition, &missing).is_err());

        let no_id = json!({"resourceType": "Condition", "id": ""});
        assert!(validate_resource_with_id(ResourceType::Condition, &no_id).is_err());

        assert!(validate_resource(ResourceType::Condition, &json!([])).is_err());
    }

    #[test]
    fn test_display_text_fallbacks() {
        assert_eq!(
            display_text(&json!({"text": "Asthma"})).as_deref(),
            Some("Asthma")
        );
        assert_eq!(
            display_text(&json!({"coding": [{"code": "195967001", "display": "Asthma"}]}))
                .as_deref(),
            Some("Asthma")
        );
        assert_eq!(
            display_text(&json!({"coding": [{"code": "195967001"}]})).as_deref(),
            Some("195967001")
        );
        assert_eq!(display_text(&json!({})), None);
    }

    #[test]
    fn test_human_name() {
        let patient = json!({"name": [{"given": ["Ada", "M"], "family": "Lovelace"}]});
        assert_eq!(human_name(&patient).as_deref(), Some("Ada M Lovelace"));
        assert_eq!(human_name(&json!({"name": []})), None);
    }
}
