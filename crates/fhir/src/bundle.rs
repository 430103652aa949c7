//! Per-patient resource bundles.
//!
//! A [`ResourceBundle`] is everything fetched for one patient from one
//! source: the Patient plus ordered lists of its clinical and financial
//! resources.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::client::FhirGateway;
use crate::error::FhirResult;
use crate::resource::{ResourceType, validate_resource_with_id};

/// Child resource types in the order they are fetched and migrated.
pub const CHILD_TYPES: [ResourceType; 8] = [
    ResourceType::Condition,
    ResourceType::Observation,
    ResourceType::MedicationRequest,
    ResourceType::AllergyIntolerance,
    ResourceType::Immunization,
    ResourceType::Coverage,
    ResourceType::Claim,
    ResourceType::ExplanationOfBenefit,
];

/// Resources fetched for one patient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceBundle {
    /// The Patient resource.
    #[serde(default)]
    pub patient: Value,
    #[serde(default)]
    pub conditions: Vec<Value>,
    #[serde(default)]
    pub observations: Vec<Value>,
    #[serde(default)]
    pub medications: Vec<Value>,
    #[serde(default)]
    pub allergies: Vec<Value>,
    #[serde(default)]
    pub immunizations: Vec<Value>,
    #[serde(default)]
    pub coverages: Vec<Value>,
    #[serde(default)]
    pub claims: Vec<Value>,
    #[serde(default)]
    pub explanations_of_benefit: Vec<Value>,
}

impl ResourceBundle {
    /// Creates a bundle holding only a Patient.
    pub fn for_patient(patient: Value) -> Self {
        Self {
            patient,
            ..Default::default()
        }
    }

    /// The list holding resources of `resource_type`, if it is a child type.
    pub fn collection(&self, resource_type: ResourceType) -> Option<&[Value]> {
        let list = match resource_type {
            ResourceType::Condition => &self.conditions,
            ResourceType::Observation => &self.observations,
            ResourceType::MedicationRequest => &self.medications,
            ResourceType::AllergyIntolerance => &self.allergies,
            ResourceType::Immunization => &self.immunizations,
            ResourceType::Coverage => &self.coverages,
            ResourceType::Claim => &self.claims,
            ResourceType::ExplanationOfBenefit => &self.explanations_of_benefit,
            _ => return None,
        };
        Some(list.as_slice())
    }

    fn collection_mut(&mut self, resource_type: ResourceType) -> Option<&mut Vec<Value>> {
        match resource_type {
            ResourceType::Condition => Some(&mut self.conditions),
            ResourceType::Observation => Some(&mut self.observations),
            ResourceType::MedicationRequest => Some(&mut self.medications),
            ResourceType::AllergyIntolerance => Some(&mut self.allergies),
            ResourceType::Immunization => Some(&mut self.immunizations),
            ResourceType::Coverage => Some(&mut self.coverages),
            ResourceType::Claim => Some(&mut self.claims),
            ResourceType::ExplanationOfBenefit => Some(&mut self.explanations_of_benefit),
            _ => None,
        }
    }

    /// Child collections in migration order.
    pub fn collections(&self) -> impl Iterator<Item = (ResourceType, &[Value])> {
        CHILD_TYPES
            .into_iter()
            .filter_map(|t| self.collection(t).map(|list| (t, list)))
    }

    /// Total number of child resources.
    pub fn total(&self) -> usize {
        self.collections().map(|(_, list)| list.len()).sum()
    }

    /// Whether the bundle holds no child resources.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Fetches a patient and all of its child resources from `gateway`.
///
/// Types are fetched one after another; the first failure aborts the fetch.
pub async fn fetch_bundle(
    gateway: &dyn FhirGateway,
    patient_id: &str,
    token: Option<&str>,
) -> FhirResult<ResourceBundle> {
    info!(source = %gateway.base_url(), patient_id = %patient_id, "Fetching patient bundle");

    let patient = gateway.get(ResourceType::Patient, patient_id).await?;
    validate_resource_with_id(ResourceType::Patient, &patient)?;

    let mut bundle = ResourceBundle::for_patient(patient);
    let params = vec![("patient".to_string(), patient_id.to_string())];

    for resource_type in CHILD_TYPES {
        let resources = gateway.search(resource_type, &params, token).await?;
        debug!(resource_type = %resource_type, count = resources.len(), "Fetched resources");
        if let Some(list) = bundle.collection_mut(resource_type) {
            *list = resources;
        }
    }

    info!(total = bundle.total(), "Patient bundle fetched");
    Ok(bundle)
}
