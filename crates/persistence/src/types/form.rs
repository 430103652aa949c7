//! Intake form templates and prefilled forms.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::text_enum;

text_enum! {
    /// Where a form field's value comes from.
    FieldSource ("field source") {
        PatientName => "patient_name",
        BirthDate => "birth_date",
        Gender => "gender",
        Phone => "phone",
        Address => "address",
        ActiveConditions => "active_conditions",
        Medications => "medications",
        Allergies => "allergies",
        Immunizations => "immunizations",
        Insurance => "insurance",
        /// Filled in by the patient; never prefilled.
        FreeText => "free_text",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    /// Key of the value in a [`PrefilledForm`].
    pub key: String,
    pub label: String,
    pub source: FieldSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplate {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FormField>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFormTemplate {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FormField>,
}

/// A template filled from the patient's record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefilledForm {
    pub id: String,
    pub template_id: String,
    pub appointment_id: Option<String>,
    /// Values by field key.
    pub values: BTreeMap<String, String>,
    /// Keys of fields the record could not fill.
    pub missing_fields: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrefilledForm {
    pub template_id: String,
    pub appointment_id: Option<String>,
    pub values: BTreeMap<String, String>,
    pub missing_fields: Vec<String>,
}
