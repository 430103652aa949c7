//! ClinicalTrials.gov adapter (API v2).

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::{Clock, SystemClock, TtlCache, cache_key};
use crate::error::{ExternalError, ExternalResult};
use crate::http::{AdapterConfig, UpstreamClient, count_field, non_blank, str_field, str_list};
use crate::lookup::Lookup;

pub const DEFAULT_BASE_URL: &str = "https://clinicaltrials.gov/api/v2";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

static NCT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^NCT\d{8}$").expect("static NCT id pattern"));

/// Search parameters for trials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrialSearchCriteria {
    pub condition: Option<String>,
    pub term: Option<String>,
    pub location: Option<String>,
    /// Overall status filters such as `RECRUITING`.
    pub statuses: Vec<String>,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

impl TrialSearchCriteria {
    /// Checks that at least one of condition, term or location is given.
    pub fn validate(&self) -> ExternalResult<()> {
        if non_blank(&self.condition).is_none()
            && non_blank(&self.term).is_none()
            && non_blank(&self.location).is_none()
        {
            return Err(ExternalError::invalid(
                "condition",
                "at least one of condition, term or location is required",
            ));
        }
        if self.page_size == Some(0) {
            return Err(ExternalError::invalid("pageSize", "must be at least 1"));
        }
        Ok(())
    }

    fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    fn status_filter(&self) -> Option<String> {
        let statuses: Vec<String> = self
            .statuses
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        (!statuses.is_empty()).then(|| statuses.join(","))
    }

    /// Search terms are case-folded; the page token is opaque and keeps its case.
    fn cache_key(&self) -> String {
        let page_size = self.page_size().to_string();
        let statuses = self.status_filter();
        let key = cache_key(
            "trials:search",
            &[
                ("cond", self.condition.as_deref()),
                ("term", self.term.as_deref()),
                ("locn", self.location.as_deref()),
                ("status", statuses.as_deref()),
                ("pageSize", Some(&page_size)),
            ],
        );
        match non_blank(&self.page_token) {
            Some(token) => format!("{}&pageToken={}", key, token),
            None => key,
        }
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(cond) = non_blank(&self.condition) {
            query.push(("query.cond", cond.to_string()));
        }
        if let Some(term) = non_blank(&self.term) {
            query.push(("query.term", term.to_string()));
        }
        if let Some(locn) = non_blank(&self.location) {
            query.push(("query.locn", locn.to_string()));
        }
        if let Some(statuses) = self.status_filter() {
            query.push(("filter.overallStatus", statuses));
        }
        query.push(("pageSize", self.page_size().to_string()));
        if let Some(token) = non_blank(&self.page_token) {
            query.push(("pageToken", token.to_string()));
        }
        query.push(("countTotal", "true".to_string()));
        query
    }
}

/// A trial site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialLocation {
    pub facility: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub status: Option<String>,
}

/// Who may enrol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub criteria: Option<String>,
    pub sex: Option<String>,
    pub minimum_age: Option<String>,
    pub maximum_age: Option<String>,
    pub healthy_volunteers: Option<bool>,
}

/// A registered study, flattened from the v2 `protocolSection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalTrial {
    pub nct_id: String,
    pub title: String,
    pub official_title: Option<String>,
    pub status: Option<String>,
    pub phases: Vec<String>,
    pub conditions: Vec<String>,
    pub summary: Option<String>,
    pub sponsor: Option<String>,
    pub eligibility: Option<Eligibility>,
    pub locations: Vec<TrialLocation>,
}

impl ClinicalTrial {
    /// Parses one element of the v2 `studies` array. Studies without an NCT
    /// id are rejected.
    pub fn from_study(study: &Value) -> Option<Self> {
        let protocol = study.get("protocolSection")?;
        let nct_id = str_field(protocol, "/identificationModule/nctId")?;
        let title = str_field(protocol, "/identificationModule/briefTitle")
            .unwrap_or_else(|| "Untitled study".to_string());

        let eligibility = protocol.get("eligibilityModule").map(|e| Eligibility {
            criteria: str_field(e, "/eligibilityCriteria"),
            sex: str_field(e, "/sex"),
            minimum_age: str_field(e, "/minimumAge"),
            maximum_age: str_field(e, "/maximumAge"),
            healthy_volunteers: e.get("healthyVolunteers").and_then(Value::as_bool),
        });

        let locations = protocol
            .pointer("/contactsLocationsModule/locations")
            .and_then(Value::as_array)
            .map(|sites| {
                sites
                    .iter()
                    .map(|site| TrialLocation {
                        facility: str_field(site, "/facility"),
                        city: str_field(site, "/city"),
                        state: str_field(site, "/state"),
                        country: str_field(site, "/country"),
                        status: str_field(site, "/status"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            nct_id,
            title,
            official_title: str_field(protocol, "/identificationModule/officialTitle"),
            status: str_field(protocol, "/statusModule/overallStatus"),
            phases: str_list(protocol, "/designModule/phases"),
            conditions: str_list(protocol, "/conditionsModule/conditions"),
            summary: str_field(protocol, "/descriptionModule/briefSummary"),
            sponsor: str_field(protocol, "/sponsorCollaboratorsModule/leadSponsor/name"),
            eligibility,
            locations,
        })
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialSearchResult {
    pub results: Vec<ClinicalTrial>,
    pub total_count: u64,
    pub next_page_token: Option<String>,
}

impl TrialSearchResult {
    fn from_response(body: &Value) -> Self {
        let results: Vec<ClinicalTrial> = body
            .get("studies")
            .and_then(Value::as_array)
            .map(|studies| studies.iter().filter_map(ClinicalTrial::from_study).collect())
            .unwrap_or_default();
        let total_count = count_field(body, "/totalCount").unwrap_or(results.len() as u64);
        Self {
            total_count,
            next_page_token: str_field(body, "/nextPageToken"),
            results,
        }
    }

    fn empty() -> Self {
        Self {
            results: Vec::new(),
            total_count: 0,
            next_page_token: None,
        }
    }
}

/// Normalizes and checks an NCT id (`NCT` followed by eight digits).
pub fn normalize_nct_id(nct_id: &str) -> ExternalResult<String> {
    let normalized = nct_id.trim().to_uppercase();
    if NCT_ID.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(ExternalError::invalid(
            "nctId",
            "must be NCT followed by 8 digits",
        ))
    }
}

/// Client for the ClinicalTrials.gov v2 REST API.
pub struct ClinicalTrialsClient {
    upstream: UpstreamClient,
    searches: TtlCache<TrialSearchResult>,
    studies: TtlCache<Option<ClinicalTrial>>,
}

impl ClinicalTrialsClient {
    pub fn new(config: &AdapterConfig) -> ExternalResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AdapterConfig, clock: Arc<dyn Clock>) -> ExternalResult<Self> {
        Ok(Self {
            upstream: UpstreamClient::new("ClinicalTrials.gov", config)?,
            searches: TtlCache::with_clock(config.cache_ttl, clock.clone()),
            studies: TtlCache::with_clock(config.cache_ttl, clock),
        })
    }

    /// Configuration pointing at the public API.
    pub fn default_config() -> AdapterConfig {
        AdapterConfig::new(DEFAULT_BASE_URL, DEFAULT_CACHE_TTL)
    }

    /// Searches studies.
    pub async fn search(
        &self,
        criteria: &TrialSearchCriteria,
    ) -> ExternalResult<Lookup<TrialSearchResult>> {
        criteria.validate()?;

        let key = criteria.cache_key();
        if let Some(hit) = self.searches.get(&key) {
            debug!(key = %key, "Trial search cache hit");
            return Ok(Lookup::ok(hit));
        }

        let result = match self.upstream.get_json("/studies", &criteria.query()).await {
            Ok(Some(body)) => TrialSearchResult::from_response(&body),
            Ok(None) => TrialSearchResult::empty(),
            Err(e) => return Ok(self.upstream.degraded("search", e)),
        };

        self.searches.insert(key, result.clone());
        Ok(Lookup::ok(result))
    }

    /// Looks up one study by NCT id. An unknown id is `Ok(None)`.
    pub async fn get_by_study_id(
        &self,
        nct_id: &str,
    ) -> ExternalResult<Lookup<Option<ClinicalTrial>>> {
        let nct_id = normalize_nct_id(nct_id)?;
        let key = cache_key("trials:study", &[("nctId", Some(&nct_id))]);
        if let Some(hit) = self.studies.get(&key) {
            return Ok(Lookup::ok(hit));
        }

        let path = format!("/studies/{}", nct_id);
        let trial = match self.upstream.get_json(&path, &[]).await {
            Ok(Some(body)) => ClinicalTrial::from_study(&body),
            Ok(None) => None,
            Err(e) => return Ok(self.upstream.degraded("get_by_study_id", e)),
        };

        self.studies.insert(key, trial.clone());
        Ok(Lookup::ok(trial))
    }

    pub fn service_name(&self) -> &'static str {
        self.upstream.service()
    }
}
