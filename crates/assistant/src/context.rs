//! Plain-text clinical context for LLM prompts.
//!
//! A [`ClinicalContext`] flattens a [`ResourceBundle`] into short labelled
//! sections, one line per item, in a fixed order: patient, conditions,
//! medications, allergies, observations, immunizations, coverage. The text
//! is cut at a line boundary once it reaches the character budget.

use carebridge_fhir::ResourceBundle;
use carebridge_fhir::resource::{display_text, human_name};
use serde::Serialize;
use serde_json::Value;

/// Default context size in characters.
pub const DEFAULT_CONTEXT_BUDGET: usize = 12_000;

/// Observations beyond this many (newest first) are left out.
pub const MAX_OBSERVATIONS: usize = 20;

/// Patient record summarized for a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClinicalContext {
    pub text: String,
    /// Whether lines were dropped to fit the budget.
    pub truncated: bool,
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn concept(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(display_text)
}

/// `text (detail, detail)` with absent details left out.
fn line(text: String, details: &[Option<String>]) -> String {
    let details: Vec<&str> = details.iter().flatten().map(String::as_str).collect();
    if details.is_empty() {
        format!("- {}", text)
    } else {
        format!("- {} ({})", text, details.join(", "))
    }
}

fn patient_lines(patient: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(name) = human_name(patient) {
        lines.push(format!("Name: {}", name));
    }
    if let Some(birth_date) = str_at(patient, "/birthDate") {
        lines.push(format!("Birth date: {}", birth_date));
    }
    if let Some(gender) = str_at(patient, "/gender") {
        lines.push(format!("Gender: {}", gender));
    }
    lines
}

fn condition_line(condition: &Value) -> String {
    line(
        concept(condition, "code").unwrap_or_else(|| "Unnamed condition".to_string()),
        &[
            concept(condition, "clinicalStatus"),
            str_at(condition, "/onsetDateTime").map(|d| format!("since {}", d)),
        ],
    )
}

fn medication_line(medication: &Value) -> String {
    let name = concept(medication, "medicationCodeableConcept")
        .or_else(|| str_at(medication, "/medicationReference/display").map(str::to_string))
        .unwrap_or_else(|| "Unnamed medication".to_string());
    line(
        name,
        &[
            str_at(medication, "/status").map(str::to_string),
            str_at(medication, "/dosageInstruction/0/text").map(str::to_string),
        ],
    )
}

fn allergy_line(allergy: &Value) -> String {
    let reactions: Vec<String> = allergy
        .get("reaction")
        .and_then(Value::as_array)
        .map(|reactions| {
            reactions
                .iter()
                .filter_map(|r| r.get("manifestation")?.as_array())
                .flatten()
                .filter_map(display_text)
                .collect()
        })
        .unwrap_or_default();
    line(
        concept(allergy, "code").unwrap_or_else(|| "Unnamed allergy".to_string()),
        &[
            str_at(allergy, "/criticality").map(|c| format!("criticality {}", c)),
            (!reactions.is_empty()).then(|| format!("reaction: {}", reactions.join(", "))),
        ],
    )
}

fn observation_value(observation: &Value) -> Option<String> {
    if let Some(quantity) = observation.get("valueQuantity") {
        let value = quantity.get("value")?;
        let unit = str_at(quantity, "/unit").unwrap_or("");
        return Some(format!("{} {}", value, unit).trim().to_string());
    }
    if let Some(text) = str_at(observation, "/valueString") {
        return Some(text.to_string());
    }
    concept(observation, "valueCodeableConcept")
}

fn observation_date(observation: &Value) -> Option<&str> {
    str_at(observation, "/effectiveDateTime").or_else(|| str_at(observation, "/issued"))
}

fn observation_lines(observations: &[Value]) -> Vec<String> {
    let mut sorted: Vec<&Value> = observations.iter().collect();
    // ISO-8601 dates sort correctly as strings; undated entries go last.
    sorted.sort_by(|a, b| observation_date(b).cmp(&observation_date(a)));
    sorted
        .into_iter()
        .take(MAX_OBSERVATIONS)
        .map(|o| {
            let name = concept(o, "code").unwrap_or_else(|| "Unnamed observation".to_string());
            let text = match observation_value(o) {
                Some(value) => format!("{}: {}", name, value),
                None => name,
            };
            line(text, &[observation_date(o).map(str::to_string)])
        })
        .collect()
}

fn immunization_line(immunization: &Value) -> String {
    line(
        concept(immunization, "vaccineCode").unwrap_or_else(|| "Unnamed vaccine".to_string()),
        &[str_at(immunization, "/occurrenceDateTime").map(str::to_string)],
    )
}

fn coverage_line(coverage: &Value) -> String {
    let payor = str_at(coverage, "/payor/0/display").map(str::to_string);
    let plan = concept(coverage, "type");
    let text = match (payor, plan) {
        (Some(payor), Some(plan)) => format!("{} {}", payor, plan),
        (Some(payor), None) => payor,
        (None, Some(plan)) => plan,
        (None, None) => "Coverage".to_string(),
    };
    line(text, &[str_at(coverage, "/status").map(str::to_string)])
}

fn section(out: &mut Vec<String>, title: &str, lines: Vec<String>) {
    if lines.is_empty() {
        return;
    }
    out.push(format!("{}:", title));
    out.extend(lines);
}

impl ClinicalContext {
    /// Builds a context within [`DEFAULT_CONTEXT_BUDGET`].
    pub fn from_bundle(bundle: &ResourceBundle) -> Self {
        Self::with_budget(bundle, DEFAULT_CONTEXT_BUDGET)
    }

    pub fn with_budget(bundle: &ResourceBundle, budget: usize) -> Self {
        let mut lines = Vec::new();
        section(&mut lines, "PATIENT", patient_lines(&bundle.patient));
        section(
            &mut lines,
            "CONDITIONS",
            bundle.conditions.iter().map(condition_line).collect(),
        );
        section(
            &mut lines,
            "MEDICATIONS",
            bundle.medications.iter().map(medication_line).collect(),
        );
        section(
            &mut lines,
            "ALLERGIES",
            bundle.allergies.iter().map(allergy_line).collect(),
        );
        section(
            &mut lines,
            "RECENT OBSERVATIONS",
            observation_lines(&bundle.observations),
        );
        section(
            &mut lines,
            "IMMUNIZATIONS",
            bundle.immunizations.iter().map(immunization_line).collect(),
        );
        section(
            &mut lines,
            "COVERAGE",
            bundle.coverages.iter().map(coverage_line).collect(),
        );

        Self::fit(lines, budget)
    }

    fn fit(lines: Vec<String>, budget: usize) -> Self {
        let mut text = String::new();
        let mut used = 0;
        let mut truncated = false;
        for line in lines {
            let cost = line.chars().count() + usize::from(!text.is_empty());
            if used + cost > budget {
                truncated = true;
                break;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&line);
            used += cost;
        }
        Self { text, truncated }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle() -> ResourceBundle {
        let mut bundle = ResourceBundle::for_patient(json!({
            "resourceType": "Patient",
            "name": [{"given": ["Jordan"], "family": "Rivera"}],
            "birthDate": "1978-04-12",
            "gender": "female"
        }));
        bundle.conditions.push(json!({
            "resourceType": "Condition",
            "code": {"text": "Hypertension"},
            "clinicalStatus": {"coding": [{"code": "active"}]}
        }));
        bundle.allergies.push(json!({
            "resourceType": "AllergyIntolerance",
            "code": {"text": "Penicillin"},
            "criticality": "high",
            "reaction": [{"manifestation": [{"text": "Hives"}]}]
        }));
        bundle
    }

    #[test]
    fn test_sections_in_order() {
        let context = ClinicalContext::from_bundle(&bundle());
        assert!(!context.truncated);
        let patient = context.text.find("PATIENT:").unwrap();
        let conditions = context.text.find("CONDITIONS:").unwrap();
        let allergies = context.text.find("ALLERGIES:").unwrap();
        assert!(patient < conditions && conditions < allergies);
        assert!(context.text.contains("Name: Jordan Rivera"));
        assert!(context.text.contains("- Hypertension (active)"));
        assert!(context.text.contains("criticality high, reaction: Hives"));
        assert!(!context.text.contains("MEDICATIONS:"));
    }

    #[test]
    fn test_latest_observations_only() {
        let mut bundle = bundle();
        for day in 1..=25 {
            bundle.observations.push(json!({
                "resourceType": "Observation",
                "code": {"text": format!("Reading {}", day)},
                "valueQuantity": {"value": day, "unit": "mg/dL"},
                "effectiveDateTime": format!("2026-01-{:02}", day)
            }));
        }
        let context = ClinicalContext::from_bundle(&bundle);
        assert!(context.text.contains("Reading 25: 25 mg/dL"));
        assert!(context.text.contains("Reading 6:"));
        assert!(!context.text.contains("Reading 5:"));
        assert!(context.text.find("Reading 25").unwrap() < context.text.find("Reading 24").unwrap());
    }

    #[test]
    fn test_truncates_at_line_boundary() {
        let context = ClinicalContext::with_budget(&bundle(), 40);
        assert!(context.truncated);
        assert!(context.text.chars().count() <= 40);
        assert!(context.text.ends_with("Jordan Rivera") || context.text.ends_with("PATIENT:"));
    }

    #[test]
    fn test_empty_bundle() {
        let context = ClinicalContext::from_bundle(&ResourceBundle::default());
        assert!(context.is_empty());
        assert!(!context.truncated);
    }
}
