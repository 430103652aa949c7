//! OpenFDA drug label adapter and the drug-interaction heuristic.
//!
//! Interactions are found by text search: for every ordered pair of drugs
//! `(a, b)` the label of `a` is scanned for a whole-word mention of `b`.
//! This finds what labels say about each other and nothing more. It is not
//! an interaction database, and every result carries a disclaimer.

use std::sync::Arc;
use std::time::Duration;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::{Clock, SystemClock, TtlCache, cache_key};
use crate::error::{ExternalError, ExternalResult};
use crate::http::{AdapterConfig, UpstreamClient, count_field, str_list};
use crate::lookup::Lookup;

pub const DEFAULT_BASE_URL: &str = "https://api.fda.gov";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

const LABEL_PATH: &str = "/drug/label.json";
const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

/// Characters on each side of a match considered when grading severity.
pub const SEVERITY_WINDOW: usize = 100;

pub const INTERACTION_DISCLAIMER: &str = "Found by searching FDA label text. This is not a complete \
     interaction check and is not medical advice; ask a pharmacist or prescriber.";

/// The parts of a structured product label Carebridge uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugLabel {
    pub id: Option<String>,
    pub brand_names: Vec<String>,
    pub generic_names: Vec<String>,
    pub manufacturer: Option<String>,
    pub routes: Vec<String>,
    pub indications: Option<String>,
    pub dosage: Option<String>,
    pub contraindications: Option<String>,
    pub boxed_warning: Option<String>,
    pub warnings: Option<String>,
    pub drug_interactions: Option<String>,
}

fn joined(label: &Value, field: &str) -> Option<String> {
    let parts = str_list(label, &format!("/{}", field));
    let text = parts.join("\n");
    (!text.trim().is_empty()).then_some(text)
}

impl DrugLabel {
    pub fn from_label(label: &Value) -> Self {
        Self {
            id: label.get("id").and_then(Value::as_str).map(str::to_string),
            brand_names: str_list(label, "/openfda/brand_name"),
            generic_names: str_list(label, "/openfda/generic_name"),
            manufacturer: str_list(label, "/openfda/manufacturer_name")
                .into_iter()
                .next(),
            routes: str_list(label, "/openfda/route"),
            indications: joined(label, "indications_and_usage"),
            dosage: joined(label, "dosage_and_administration"),
            contraindications: joined(label, "contraindications"),
            boxed_warning: joined(label, "boxed_warning"),
            warnings: joined(label, "warnings").or_else(|| joined(label, "warnings_and_cautions")),
            drug_interactions: joined(label, "drug_interactions"),
        }
    }

    /// Text sections scanned for interactions, in scan order.
    fn interaction_sections(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("drug_interactions", self.drug_interactions.as_deref()),
            ("boxed_warning", self.boxed_warning.as_deref()),
            ("warnings", self.warnings.as_deref()),
        ]
    }
}

/// Label search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugSearchResult {
    pub results: Vec<DrugLabel>,
    pub total_count: u64,
}

impl DrugSearchResult {
    fn from_response(body: &Value) -> Self {
        let results: Vec<DrugLabel> = body
            .get("results")
            .and_then(Value::as_array)
            .map(|labels| labels.iter().map(DrugLabel::from_label).collect())
            .unwrap_or_default();
        let total_count =
            count_field(body, "/meta/results/total").unwrap_or(results.len() as u64);
        Self {
            results,
            total_count,
        }
    }

    fn empty() -> Self {
        Self {
            results: Vec::new(),
            total_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionSeverity {
    Minor,
    Moderate,
    Major,
}

/// A mention of `drug_b` in the label of `drug_a`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugInteraction {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: InteractionSeverity,
    /// Label section the mention was found in.
    pub section: String,
    pub excerpt: String,
    pub disclaimer: String,
}

/// Byte range of `SEVERITY_WINDOW` characters either side of a match.
fn window(text: &str, match_start: usize, match_end: usize) -> (usize, usize) {
    let start = text[..match_start]
        .char_indices()
        .rev()
        .nth(SEVERITY_WINDOW - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let end = text[match_end..]
        .char_indices()
        .nth(SEVERITY_WINDOW)
        .map(|(idx, _)| match_end + idx)
        .unwrap_or(text.len());
    (start, end)
}

/// Grades a label mention by the words around it.
///
/// `match_start..match_end` is the byte range of the mention. The window
/// of text around it is checked for `contraindicated` (major), then
/// `monitor` (moderate); anything else is minor.
pub fn classify_severity(text: &str, match_start: usize, match_end: usize) -> InteractionSeverity {
    let (start, end) = window(text, match_start, match_end);
    let context = text[start..end].to_lowercase();
    if context.contains("contraindicated") {
        InteractionSeverity::Major
    } else if context.contains("monitor") {
        InteractionSeverity::Moderate
    } else {
        InteractionSeverity::Minor
    }
}

fn excerpt(text: &str, match_start: usize, match_end: usize) -> String {
    let (start, end) = window(text, match_start, match_end);
    text[start..end].split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Finds the first mention of `other` in `label`.
///
/// Returns `None` when the label never mentions it.
pub fn find_interaction(
    drug: &str,
    label: &DrugLabel,
    other: &str,
) -> Option<DrugInteraction> {
    let pattern = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(other)))
        .case_insensitive(true)
        .build()
        .ok()?;

    label.interaction_sections().into_iter().find_map(|(section, text)| {
        let text = text?;
        let found = pattern.find(text)?;
        Some(DrugInteraction {
            drug_a: drug.to_string(),
            drug_b: other.to_string(),
            severity: classify_severity(text, found.start(), found.end()),
            section: section.to_string(),
            excerpt: excerpt(text, found.start(), found.end()),
            disclaimer: INTERACTION_DISCLAIMER.to_string(),
        })
    })
}

/// Trims, drops blanks and removes case-insensitive duplicates.
fn distinct_names(names: &[String]) -> Vec<String> {
    let mut seen = Vec::<String>::new();
    let mut out = Vec::new();
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lowered = trimmed.to_lowercase();
        if !seen.contains(&lowered) {
            seen.push(lowered);
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Client for the OpenFDA drug label endpoint.
pub struct OpenFdaClient {
    upstream: UpstreamClient,
    searches: TtlCache<DrugSearchResult>,
}

impl OpenFdaClient {
    pub fn new(config: &AdapterConfig) -> ExternalResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AdapterConfig, clock: Arc<dyn Clock>) -> ExternalResult<Self> {
        Ok(Self {
            upstream: UpstreamClient::new("OpenFDA", config)?,
            searches: TtlCache::with_clock(config.cache_ttl, clock),
        })
    }

    pub fn default_config() -> AdapterConfig {
        AdapterConfig::new(DEFAULT_BASE_URL, DEFAULT_CACHE_TTL)
    }

    /// Searches labels by brand or generic name.
    ///
    /// OpenFDA answers 404 when nothing matches; that is an empty result.
    pub async fn search_drugs(
        &self,
        name: &str,
        limit: Option<u32>,
    ) -> ExternalResult<Lookup<DrugSearchResult>> {
        let name = name.trim().replace('"', "");
        if name.is_empty() {
            return Err(ExternalError::invalid("name", "drug name is required"));
        }
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        let limit_text = limit.to_string();
        let key = cache_key(
            "drugs:search",
            &[("name", Some(&name)), ("limit", Some(&limit_text))],
        );
        if let Some(hit) = self.searches.get(&key) {
            debug!(key = %key, "Drug search cache hit");
            return Ok(Lookup::ok(hit));
        }

        let search = format!(
            "openfda.brand_name:\"{name}\" openfda.generic_name:\"{name}\""
        );
        let query = [("search", search), ("limit", limit_text)];
        let result = match self.upstream.get_json(LABEL_PATH, &query).await {
            Ok(Some(body)) => DrugSearchResult::from_response(&body),
            Ok(None) => DrugSearchResult::empty(),
            Err(e) => return Ok(self.upstream.degraded("search_drugs", e)),
        };

        self.searches.insert(key, result.clone());
        Ok(Lookup::ok(result))
    }

    /// The best-matching label for a drug name.
    pub async fn get_label(&self, name: &str) -> ExternalResult<Lookup<Option<DrugLabel>>> {
        Ok(self
            .search_drugs(name, Some(1))
            .await?
            .map(|result| result.results.into_iter().next()))
    }

    /// Looks for label mentions between every ordered pair of drugs.
    ///
    /// Needs at least two distinct names. Drugs without a label are skipped
    /// as the scanned side but can still be found in other labels. If any
    /// label lookup is degraded the whole check is.
    pub async fn check_drug_interactions(
        &self,
        names: &[String],
    ) -> ExternalResult<Lookup<Vec<DrugInteraction>>> {
        let names = distinct_names(names);
        if names.len() < 2 {
            return Err(ExternalError::invalid(
                "drugs",
                "at least two distinct drug names are required",
            ));
        }

        let mut labels = Vec::with_capacity(names.len());
        for name in &names {
            match self.get_label(name).await? {
                Lookup::Ok { data } => labels.push(data),
                Lookup::Degraded { reason } => return Ok(Lookup::Degraded { reason }),
            }
        }

        let mut interactions = Vec::new();
        for (name, label) in names.iter().zip(&labels) {
            let Some(label) = label else { continue };
            for other in names.iter().filter(|other| *other != name) {
                if let Some(found) = find_interaction(name, label, other) {
                    interactions.push(found);
                }
            }
        }

        debug!(
            drugs = names.len(),
            interactions = interactions.len(),
            "Drug interaction check complete"
        );
        Ok(Lookup::ok(interactions))
    }
}
