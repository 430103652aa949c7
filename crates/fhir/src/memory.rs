//! In-process FHIR gateway.
//!
//! [`MemoryGateway`] keeps resources in a map and implements the same
//! [`FhirGateway`] contract as the HTTP client. It backs the demo provider
//! and stands in for real servers in tests, where its create counter and
//! failure injection make migration behavior observable.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::client::FhirGateway;
use crate::error::{FhirError, FhirResult};
use crate::resource::{ResourceType, resource_id};

/// Map-backed [`FhirGateway`].
#[derive(Debug)]
pub struct MemoryGateway {
    name: String,
    resources: RwLock<BTreeMap<(ResourceType, String), Value>>,
    create_calls: AtomicUsize,
    fail_on_create: Option<usize>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MemoryGateway {
    /// Creates an empty gateway identified by `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: RwLock::new(BTreeMap::new()),
            create_calls: AtomicUsize::new(0),
            fail_on_create: None,
        }
    }

    /// Makes the `n`-th create call (1-based) fail.
    pub fn failing_on_create(mut self, n: usize) -> Self {
        self.fail_on_create = Some(n);
        self
    }

    /// Stores a resource under its own id, replacing any previous copy.
    ///
    /// Resources without a `resourceType` or `id` are ignored.
    pub fn seed(&self, resource: Value) {
        let Some(resource_type) = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .and_then(|t| t.parse::<ResourceType>().ok())
        else {
            return;
        };
        let Some(id) = resource_id(&resource).map(str::to_string) else {
            return;
        };
        self.resources.write().insert((resource_type, id), resource);
    }

    /// Number of create calls received, including failed ones.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of stored resources of a type.
    pub fn count(&self, resource_type: ResourceType) -> usize {
        self.resources
            .read()
            .keys()
            .filter(|(t, _)| *t == resource_type)
            .count()
    }

    /// All stored resources of a type.
    pub fn all(&self, resource_type: ResourceType) -> Vec<Value> {
        self.resources
            .read()
            .iter()
            .filter(|((t, _), _)| *t == resource_type)
            .map(|(_, v)| v.clone())
            .collect()
    }

    fn not_found(resource_type: ResourceType, id: &str) -> FhirError {
        FhirError::Status {
            status: 404,
            body: format!("{}/{} not found", resource_type, id),
        }
    }
}

/// Whether `resource` satisfies every supported search parameter.
///
/// `patient` and `subject` match the type's patient reference field by
/// `Patient/<id>` or bare id; `_id` matches the logical id. Other
/// parameters are ignored.
fn matches_params(resource_type: ResourceType, resource: &Value, params: &[(String, String)]) -> bool {
    params.iter().all(|(name, value)| match name.as_str() {
        "_id" => resource_id(resource) == Some(value.as_str()),
        "patient" | "subject" => {
            let Some(field) = resource_type.patient_reference_field() else {
                return resource_type == ResourceType::Patient
                    && resource_id(resource) == Some(value.trim_start_matches("Patient/"));
            };
            let wanted = value.trim_start_matches("Patient/");
            resource
                .get(field)
                .and_then(|r| r.get("reference"))
                .and_then(Value::as_str)
                .map(|r| r.trim_start_matches("Patient/") == wanted)
                .unwrap_or(false)
        }
        _ => true,
    })
}

#[async_trait]
impl FhirGateway for MemoryGateway {
    fn base_url(&self) -> &str {
        &self.name
    }

    async fn create(&self, resource_type: ResourceType, mut resource: Value) -> FhirResult<Value> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_create == Some(call) {
            return Err(FhirError::Gateway {
                message: format!("injected failure on create #{}", call),
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        let obj = resource
            .as_object_mut()
            .ok_or_else(|| FhirError::InvalidResource {
                resource_type: resource_type.to_string(),
                message: "resource must be a JSON object".to_string(),
            })?;
        obj.insert("id".to_string(), Value::String(id.clone()));
        obj.insert(
            "meta".to_string(),
            serde_json::json!({
                "versionId": "1",
                "lastUpdated": chrono::Utc::now().to_rfc3339()
            }),
        );

        self.resources
            .write()
            .insert((resource_type, id), resource.clone());
        Ok(resource)
    }

    async fn get(&self, resource_type: ResourceType, id: &str) -> FhirResult<Value> {
        self.resources
            .read()
            .get(&(resource_type, id.to_string()))
            .cloned()
            .ok_or_else(|| Self::not_found(resource_type, id))
    }

    async fn search(
        &self,
        resource_type: ResourceType,
        params: &[(String, String)],
        _token: Option<&str>,
    ) -> FhirResult<Vec<Value>> {
        Ok(self
            .resources
            .read()
            .iter()
            .filter(|((t, _), v)| *t == resource_type && matches_params(resource_type, v, params))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn update(
        &self,
        resource_type: ResourceType,
        id: &str,
        mut resource: Value,
    ) -> FhirResult<Value> {
        let mut resources = self.resources.write();
        let key = (resource_type, id.to_string());
        if !resources.contains_key(&key) {
            return Err(Self::not_found(resource_type, id));
        }
        if let Some(obj) = resource.as_object_mut() {
            obj.insert("id".to_string(), Value::String(id.to_string()));
        }
        resources.insert(key, resource.clone());
        Ok(resource)
    }

    async fn delete(&self, resource_type: ResourceType, id: &str) -> FhirResult<()> {
        self.resources
            .write()
            .remove(&(resource_type, id.to_string()))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(resource_type, id))
    }
}
