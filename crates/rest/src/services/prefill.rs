//! Filling form templates from a patient's record.

use std::collections::BTreeMap;

use serde_json::Value;

use carebridge_fhir::ResourceBundle;
use carebridge_fhir::resource::{display_text, human_name};
use carebridge_persistence::types::{FieldSource, FormTemplate};

/// Values resolved for a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefillResult {
    pub values: BTreeMap<String, String>,
    /// Keys of fields the record could not answer, in template order.
    pub missing_fields: Vec<String>,
}

fn text_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Active unless a status says otherwise.
fn is_active(resource: &Value) -> bool {
    let status = resource
        .get("clinicalStatus")
        .and_then(display_text)
        .or_else(|| text_at(resource, "/status").map(str::to_string));
    match status {
        Some(status) => status.eq_ignore_ascii_case("active"),
        None => true,
    }
}

fn join(items: Vec<String>) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join("; "))
    }
}

fn phone(patient: &Value) -> Option<String> {
    patient
        .get("telecom")?
        .as_array()?
        .iter()
        .find(|t| text_at(t, "/system") == Some("phone"))
        .and_then(|t| text_at(t, "/value"))
        .map(str::to_string)
}

fn address(patient: &Value) -> Option<String> {
    let address = patient.get("address")?.as_array()?.first()?;
    if let Some(text) = text_at(address, "/text") {
        return Some(text.to_string());
    }

    let mut parts: Vec<String> = address
        .get("line")
        .and_then(Value::as_array)
        .map(|lines| lines.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    if let Some(city) = text_at(address, "/city") {
        parts.push(city.to_string());
    }
    let region = [text_at(address, "/state"), text_at(address, "/postalCode")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !region.is_empty() {
        parts.push(region);
    }

    (!parts.is_empty()).then(|| parts.join(", "))
}

fn medication_name(medication: &Value) -> Option<String> {
    medication
        .get("medicationCodeableConcept")
        .and_then(display_text)
        .or_else(|| text_at(medication, "/medicationReference/display").map(str::to_string))
}

fn insurance(coverage: &Value) -> Option<String> {
    let payor = text_at(coverage, "/payor/0/display");
    let plan = coverage.get("type").and_then(display_text);
    match (payor, plan) {
        (Some(payor), Some(plan)) => Some(format!("{} ({})", payor, plan)),
        (Some(payor), None) => Some(payor.to_string()),
        (None, plan) => plan,
    }
}

/// Answers one field from the record.
///
/// Free-text fields are never answered.
pub fn resolve_field(source: FieldSource, bundle: &ResourceBundle) -> Option<String> {
    let patient = &bundle.patient;
    match source {
        FieldSource::PatientName => human_name(patient),
        FieldSource::BirthDate => text_at(patient, "/birthDate").map(str::to_string),
        FieldSource::Gender => text_at(patient, "/gender").map(str::to_string),
        FieldSource::Phone => phone(patient),
        FieldSource::Address => address(patient),
        FieldSource::ActiveConditions => join(
            bundle
                .conditions
                .iter()
                .filter(|c| is_active(c))
                .filter_map(|c| c.get("code").and_then(display_text))
                .collect(),
        ),
        FieldSource::Medications => join(
            bundle
                .medications
                .iter()
                .filter(|m| is_active(m))
                .filter_map(medication_name)
                .collect(),
        ),
        FieldSource::Allergies => join(
            bundle
                .allergies
                .iter()
                .filter_map(|a| a.get("code").and_then(display_text))
                .collect(),
        ),
        FieldSource::Immunizations => join(
            bundle
                .immunizations
                .iter()
                .filter_map(|i| i.get("vaccineCode").and_then(display_text))
                .collect(),
        ),
        FieldSource::Insurance => join(bundle.coverages.iter().filter_map(insurance).collect()),
        FieldSource::FreeText => None,
    }
}

/// Resolves every field of `template` from `bundle`.
pub fn prefill_template(template: &FormTemplate, bundle: &ResourceBundle) -> PrefillResult {
    let mut result = PrefillResult::default();
    for field in &template.fields {
        match resolve_field(field.source, bundle) {
            Some(value) => {
                result.values.insert(field.key.clone(), value);
            }
            None => result.missing_fields.push(field.key.clone()),
        }
    }
    result
}
