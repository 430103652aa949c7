//! Shared HTTP plumbing for the adapters.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ExternalError, ExternalResult, UpstreamError};
use crate::lookup::Lookup;

/// Default timeout for third-party requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for one adapter.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// API root, e.g. `https://clinicaltrials.gov/api/v2`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How long successful answers are cached.
    pub cache_ttl: Duration,
}

impl AdapterConfig {
    pub fn new(base_url: impl Into<String>, cache_ttl: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            cache_ttl,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A JSON-over-HTTP client bound to one upstream service.
pub(crate) struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    service: &'static str,
}

impl UpstreamClient {
    pub(crate) fn new(service: &'static str, config: &AdapterConfig) -> ExternalResult<Self> {
        url::Url::parse(&config.base_url).map_err(|e| ExternalError::InvalidBaseUrl {
            url: config.base_url.clone(),
            message: e.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("carebridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExternalError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service,
        })
    }

    pub(crate) fn service(&self) -> &'static str {
        self.service
    }

    /// GETs `path` under the base URL.
    ///
    /// A 404 is `Ok(None)`; it means "no such thing" to every upstream used
    /// here. Other non-success statuses are errors.
    pub(crate) async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<Value>, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(service = self.service, url = %url, "Upstream request");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| UpstreamError::Decode {
                message: e.to_string(),
            })
    }

    /// Logs an upstream failure and turns it into a degraded lookup.
    ///
    /// The reason returned to callers never carries upstream detail.
    pub(crate) fn degraded<T>(&self, operation: &str, err: UpstreamError) -> Lookup<T> {
        match &err {
            UpstreamError::Status { status, body } => warn!(
                service = self.service,
                operation,
                status,
                body = %truncate(body, 200),
                "Upstream request failed"
            ),
            other => warn!(
                service = self.service,
                operation,
                error = %other,
                "Upstream request failed"
            ),
        }
        Lookup::degraded(format!("{} is temporarily unavailable", self.service))
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Reads a string field, treating blanks as absent.
pub(crate) fn str_field(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads an array of strings; non-string elements are skipped.
pub(crate) fn str_list(value: &Value, pointer: &str) -> Vec<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Reads a non-negative count that upstreams send as a number or a string.
pub(crate) fn count_field(value: &Value, pointer: &str) -> Option<u64> {
    match value.pointer(pointer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Trims an optional parameter, treating blanks as absent.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
