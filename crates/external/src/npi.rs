//! NPI Registry adapter (API version 2.1).

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::{Clock, SystemClock, TtlCache, cache_key};
use crate::error::{ExternalError, ExternalResult, UpstreamError};
use crate::http::{AdapterConfig, UpstreamClient, count_field, non_blank, str_field};
use crate::lookup::Lookup;

pub const DEFAULT_BASE_URL: &str = "https://npiregistry.cms.hhs.gov/api";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

const API_VERSION: &str = "2.1";
const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 200;

/// Provider search parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderSearchCriteria {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization_name: Option<String>,
    /// Taxonomy description, e.g. `Family Medicine`.
    pub taxonomy: Option<String>,
    pub city: Option<String>,
    /// Two-letter state code.
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub limit: Option<u32>,
}

impl ProviderSearchCriteria {
    /// Location alone is too broad; a name, organization or taxonomy is
    /// required.
    pub fn validate(&self) -> ExternalResult<()> {
        if non_blank(&self.first_name).is_none()
            && non_blank(&self.last_name).is_none()
            && non_blank(&self.organization_name).is_none()
            && non_blank(&self.taxonomy).is_none()
        {
            return Err(ExternalError::invalid(
                "lastName",
                "a name, organization name or taxonomy is required",
            ));
        }
        if let Some(state) = non_blank(&self.state) {
            if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ExternalError::invalid("state", "must be a two-letter code"));
            }
        }
        Ok(())
    }

    fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    fn fields(&self) -> [(&'static str, Option<&str>); 7] {
        [
            ("first_name", non_blank(&self.first_name)),
            ("last_name", non_blank(&self.last_name)),
            ("organization_name", non_blank(&self.organization_name)),
            ("taxonomy_description", non_blank(&self.taxonomy)),
            ("city", non_blank(&self.city)),
            ("state", non_blank(&self.state)),
            ("postal_code", non_blank(&self.postal_code)),
        ]
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("version", API_VERSION.to_string())];
        for (name, value) in self.fields() {
            if let Some(value) = value {
                let value = if name == "state" {
                    value.to_uppercase()
                } else {
                    value.to_string()
                };
                query.push((name, value));
            }
        }
        query.push(("limit", self.limit().to_string()));
        query
    }

    fn cache_key(&self) -> String {
        let limit = self.limit().to_string();
        let mut params: Vec<(&str, Option<&str>)> = self.fields().to_vec();
        params.push(("limit", Some(&limit)));
        cache_key("npi:search", &params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Individual,
    Organization,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAddress {
    /// `LOCATION` or `MAILING`.
    pub purpose: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
}

/// A registered provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub npi: String,
    pub kind: ProviderKind,
    pub name: String,
    pub credential: Option<String>,
    pub primary_taxonomy: Option<String>,
    pub addresses: Vec<ProviderAddress>,
    /// Phone of the practice location, if listed.
    pub phone: Option<String>,
}

impl Provider {
    /// Parses one element of the registry's `results` array.
    pub fn from_result(result: &Value) -> Option<Self> {
        let npi = match result.get("number")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let kind = match result.get("enumeration_type").and_then(Value::as_str) {
            Some("NPI-2") => ProviderKind::Organization,
            _ => ProviderKind::Individual,
        };

        let basic = result.get("basic").cloned().unwrap_or(Value::Null);
        let name = match kind {
            ProviderKind::Organization => str_field(&basic, "/organization_name"),
            ProviderKind::Individual => {
                let parts: Vec<String> = ["/first_name", "/middle_name", "/last_name"]
                    .iter()
                    .filter_map(|p| str_field(&basic, p))
                    .collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            }
        }
        .unwrap_or_else(|| npi.clone());

        let addresses: Vec<ProviderAddress> = result
            .get("addresses")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .map(|a| ProviderAddress {
                        purpose: str_field(a, "/address_purpose"),
                        line1: str_field(a, "/address_1"),
                        line2: str_field(a, "/address_2"),
                        city: str_field(a, "/city"),
                        state: str_field(a, "/state"),
                        postal_code: str_field(a, "/postal_code"),
                        phone: str_field(a, "/telephone_number"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let phone = addresses
            .iter()
            .find(|a| a.purpose.as_deref() == Some("LOCATION"))
            .or_else(|| addresses.first())
            .and_then(|a| a.phone.clone());

        let taxonomies = result.get("taxonomies").and_then(Value::as_array);
        let primary_taxonomy = taxonomies.and_then(|list| {
            list.iter()
                .find(|t| t.get("primary").and_then(Value::as_bool) == Some(true))
                .or_else(|| list.first())
                .and_then(|t| str_field(t, "/desc"))
        });

        Some(Self {
            npi,
            kind,
            name,
            credential: str_field(&basic, "/credential"),
            primary_taxonomy,
            addresses,
            phone,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSearchResult {
    pub results: Vec<Provider>,
    pub total_count: u64,
}

/// Parses a registry response.
///
/// The registry reports bad queries as HTTP 200 with an `Errors` array;
/// those surface as decode errors so the caller degrades.
fn parse_response(body: &Value) -> Result<ProviderSearchResult, UpstreamError> {
    if let Some(errors) = body.get("Errors").and_then(Value::as_array) {
        let message = errors
            .iter()
            .filter_map(|e| str_field(e, "/description"))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(UpstreamError::Decode { message });
    }

    let results: Vec<Provider> = body
        .get("results")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Provider::from_result).collect())
        .unwrap_or_default();
    let total_count = count_field(body, "/result_count").unwrap_or(results.len() as u64);
    Ok(ProviderSearchResult {
        results,
        total_count,
    })
}

/// Checks an NPI: exactly ten digits.
pub fn validate_npi(npi: &str) -> ExternalResult<&str> {
    let npi = npi.trim();
    if npi.len() == 10 && npi.chars().all(|c| c.is_ascii_digit()) {
        Ok(npi)
    } else {
        Err(ExternalError::invalid("npi", "must be exactly 10 digits"))
    }
}

/// Client for the CMS NPI Registry.
pub struct NpiRegistryClient {
    upstream: UpstreamClient,
    searches: TtlCache<ProviderSearchResult>,
    providers: TtlCache<Option<Provider>>,
}

impl NpiRegistryClient {
    pub fn new(config: &AdapterConfig) -> ExternalResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AdapterConfig, clock: Arc<dyn Clock>) -> ExternalResult<Self> {
        Ok(Self {
            upstream: UpstreamClient::new("NPI Registry", config)?,
            searches: TtlCache::with_clock(config.cache_ttl, clock.clone()),
            providers: TtlCache::with_clock(config.cache_ttl, clock),
        })
    }

    pub fn default_config() -> AdapterConfig {
        AdapterConfig::new(DEFAULT_BASE_URL, DEFAULT_CACHE_TTL)
    }

    async fn fetch(&self, query: &[(&str, String)]) -> Result<ProviderSearchResult, UpstreamError> {
        match self.upstream.get_json("/", query).await? {
            Some(body) => parse_response(&body),
            None => Ok(ProviderSearchResult {
                results: Vec::new(),
                total_count: 0,
            }),
        }
    }

    pub async fn search(
        &self,
        criteria: &ProviderSearchCriteria,
    ) -> ExternalResult<Lookup<ProviderSearchResult>> {
        criteria.validate()?;

        let key = criteria.cache_key();
        if let Some(hit) = self.searches.get(&key) {
            debug!(key = %key, "Provider search cache hit");
            return Ok(Lookup::ok(hit));
        }

        let result = match self.fetch(&criteria.query()).await {
            Ok(result) => result,
            Err(e) => return Ok(self.upstream.degraded("search", e)),
        };

        self.searches.insert(key, result.clone());
        Ok(Lookup::ok(result))
    }

    /// Looks up one provider. An unregistered NPI is `Ok(None)`.
    pub async fn get_by_npi(&self, npi: &str) -> ExternalResult<Lookup<Option<Provider>>> {
        let npi = validate_npi(npi)?;
        let key = cache_key("npi:number", &[("number", Some(npi))]);
        if let Some(hit) = self.providers.get(&key) {
            return Ok(Lookup::ok(hit));
        }

        let query = [
            ("version", API_VERSION.to_string()),
            ("number", npi.to_string()),
        ];
        let provider = match self.fetch(&query).await {
            Ok(result) => result.results.into_iter().next(),
            Err(e) => return Ok(self.upstream.degraded("get_by_npi", e)),
        };

        self.providers.insert(key, provider.clone());
        Ok(Lookup::ok(provider))
    }
}
