//! Provider-to-local data migration.
//!
//! [`MigrationService`] copies a fetched [`ResourceBundle`] into a
//! destination store, one `create` per resource, strictly in sequence.
//!
//! Before a child resource is created its patient reference is rewritten to
//! point at the Patient minted in the destination. Source ids and `meta` are
//! stripped so the destination assigns its own.
//!
//! The run is not transactional. A failed create aborts the migration and
//! leaves earlier creates in place; no counts are reported for a failed run.
//! Running twice duplicates every resource, since the destination carries no
//! source identity to deduplicate on.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::bundle::ResourceBundle;
use crate::client::FhirGateway;
use crate::error::MigrationError;
use crate::resource::{ResourceType, patient_reference, resource_id, validate_resource};

/// Number of resources migrated per FHIR type name.
///
/// Only types with at least one resource appear. The Patient itself is not
/// counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationCounts(BTreeMap<String, u64>);

impl MigrationCounts {
    /// Creates an empty count map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the count for a type, replacing any previous value.
    pub fn set(&mut self, resource_type: ResourceType, count: u64) {
        self.0.insert(resource_type.to_string(), count);
    }

    /// The count for a type, if one was recorded.
    pub fn get(&self, resource_type: ResourceType) -> Option<u64> {
        self.0.get(resource_type.as_str()).copied()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(type name, count)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// The underlying map.
    pub fn as_map(&self) -> &BTreeMap<String, u64> {
        &self.0
    }
}

impl From<BTreeMap<String, u64>> for MigrationCounts {
    fn from(map: BTreeMap<String, u64>) -> Self {
        Self(map)
    }
}

/// Removes source-system identity from a resource before re-creation.
fn strip_identity(resource: &mut Value) {
    if let Some(obj) = resource.as_object_mut() {
        obj.remove("id");
        obj.remove("meta");
    }
}

/// Points a child resource at the destination Patient.
///
/// The type's patient reference field is replaced outright; any source
/// reference (and its display) is discarded.
pub fn rewrite_patient_reference(
    resource_type: ResourceType,
    resource: &mut Value,
    patient_id: &str,
) {
    let Some(field) = resource_type.patient_reference_field() else {
        return;
    };
    if let Some(obj) = resource.as_object_mut() {
        obj.insert(
            field.to_string(),
            json!({ "reference": patient_reference(patient_id) }),
        );
    }
}

/// Copies provider bundles into a destination FHIR store.
pub struct MigrationService {
    destination: Arc<dyn FhirGateway>,
}

impl MigrationService {
    /// Creates a service writing into `destination`.
    pub fn new(destination: Arc<dyn FhirGateway>) -> Self {
        Self { destination }
    }

    /// The destination gateway.
    pub fn destination(&self) -> &dyn FhirGateway {
        self.destination.as_ref()
    }

    /// Migrates `patient` and every resource in `bundle`.
    ///
    /// `session_id` only labels log output; persisting the returned counts
    /// onto the session is the caller's job.
    pub async fn migrate_provider_data(
        &self,
        session_id: &str,
        patient: &Value,
        bundle: &ResourceBundle,
    ) -> Result<MigrationCounts, MigrationError> {
        info!(
            session_id = %session_id,
            destination = %self.destination.base_url(),
            resources = bundle.total(),
            "Starting provider data migration"
        );

        validate_resource(ResourceType::Patient, patient).map_err(MigrationError::InvalidPatient)?;

        let mut new_patient = patient.clone();
        strip_identity(&mut new_patient);
        let created = self
            .destination
            .create(ResourceType::Patient, new_patient)
            .await
            .map_err(MigrationError::PatientCreate)?;
        let patient_id = resource_id(&created)
            .ok_or(MigrationError::MissingPatientId)?
            .to_string();

        debug!(
            source_patient = ?resource_id(patient),
            destination_patient = %patient_id,
            "Destination patient created"
        );

        let mut counts = MigrationCounts::new();
        for (resource_type, resources) in bundle.collections() {
            if resources.is_empty() {
                continue;
            }

            for (index, resource) in resources.iter().enumerate() {
                let mut copy = resource.clone();
                strip_identity(&mut copy);
                rewrite_patient_reference(resource_type, &mut copy, &patient_id);

                if let Err(source) = self.destination.create(resource_type, copy).await {
                    warn!(
                        session_id = %session_id,
                        resource_type = %resource_type,
                        index,
                        error = %source,
                        "Migration aborted"
                    );
                    return Err(MigrationError::Create {
                        resource_type: resource_type.to_string(),
                        index,
                        source,
                    });
                }
            }

            counts.set(resource_type, resources.len() as u64);
            debug!(resource_type = %resource_type, count = resources.len(), "Migrated resources");
        }

        info!(
            session_id = %session_id,
            patient_id = %patient_id,
            total = counts.total(),
            "Provider data migration complete"
        );

        Ok(counts)
    }
}
