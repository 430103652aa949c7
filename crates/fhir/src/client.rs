//! Generic FHIR resource gateway.
//!
//! [`FhirGateway`] is the CRUD contract used both for a user's connected
//! provider and for the application's own local FHIR store. [`FhirClient`]
//! implements it over HTTP.
//!
//! Errors are propagated as-is. There is no retry and no circuit breaking;
//! each failure is logged once and handed back to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{FhirError, FhirResult};
use crate::resource::ResourceType;

/// FHIR JSON media type.
pub const FHIR_JSON: &str = "application/fhir+json";

/// Default per-request timeout for FHIR calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Query parameters for a search, in request order.
pub type SearchParams = Vec<(String, String)>;

/// CRUD contract over a FHIR server.
#[async_trait]
pub trait FhirGateway: Send + Sync {
    /// The server base URL (or a descriptive name for in-process gateways).
    fn base_url(&self) -> &str;

    /// Creates a resource; returns the server's representation with its new id.
    async fn create(&self, resource_type: ResourceType, resource: Value) -> FhirResult<Value>;

    /// Reads a resource by id.
    async fn get(&self, resource_type: ResourceType, id: &str) -> FhirResult<Value>;

    /// Searches for resources.
    ///
    /// `token` overrides the gateway's default bearer token for this call.
    async fn search(
        &self,
        resource_type: ResourceType,
        params: &[(String, String)],
        token: Option<&str>,
    ) -> FhirResult<Vec<Value>>;

    /// Replaces a resource.
    async fn update(
        &self,
        resource_type: ResourceType,
        id: &str,
        resource: Value,
    ) -> FhirResult<Value>;

    /// Deletes a resource.
    async fn delete(&self, resource_type: ResourceType, id: &str) -> FhirResult<()>;
}

/// Flattens a search response into a list of resources.
///
/// Accepts a `Bundle` (`entry[].resource`), a bare array, or a single
/// resource object. Anything else yields an empty list.
pub fn normalize_search_response(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut obj) => {
            if let Some(entries) = obj.remove("entry") {
                return match entries {
                    Value::Array(entries) => entries
                        .into_iter()
                        .filter_map(|mut entry| entry.get_mut("resource").map(Value::take))
                        .filter(|resource| !resource.is_null())
                        .collect(),
                    _ => Vec::new(),
                };
            }

            match obj.get("resourceType").and_then(Value::as_str) {
                // A Bundle without entries is an empty result, not a resource.
                Some("Bundle") | None => Vec::new(),
                Some(_) => vec![Value::Object(obj)],
            }
        }
        _ => Vec::new(),
    }
}

/// HTTP implementation of [`FhirGateway`].
#[derive(Clone)]
pub struct FhirClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl std::fmt::Debug for FhirClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FhirClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.bearer_token.is_some())
            .finish()
    }
}

impl FhirClient {
    /// Creates a client with the default timeout.
    pub fn new(base_url: &str) -> FhirResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom per-request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> FhirResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    /// Creates a client around an existing `reqwest::Client`.
    pub fn with_client(client: Client, base_url: &str) -> FhirResult<Self> {
        let trimmed = base_url.trim_end_matches('/');
        url::Url::parse(trimmed).map_err(|e| FhirError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: trimmed.to_string(),
            bearer_token: None,
        })
    }

    /// Sets the bearer token sent with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn type_url(&self, resource_type: ResourceType) -> String {
        format!("{}/{}", self.base_url, resource_type)
    }

    fn instance_url(&self, resource_type: ResourceType, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, resource_type, id)
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        query: &[(String, String)],
        body: Option<&Value>,
        token: Option<&str>,
    ) -> FhirResult<Value> {
        debug!(method = %method, url = %url, "FHIR request");

        let result = self.execute(method.clone(), &url, query, body, token).await;
        if let Err(e) = &result {
            warn!(method = %method, url = %url, error = %e, "FHIR request failed");
        }
        result
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        token: Option<&str>,
    ) -> FhirResult<Value> {
        let mut request = self
            .client
            .request(method, url)
            .header(header::ACCEPT, FHIR_JSON);

        if !query.is_empty() {
            request = request.query(query);
        }

        if let Some(token) = token.or(self.bearer_token.as_deref()) {
            request = request.bearer_auth(token);
        }

        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(|e| FhirError::Decode {
                message: e.to_string(),
            })?;
            request = request.header(header::CONTENT_TYPE, FHIR_JSON).body(bytes);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(FhirError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| FhirError::Decode {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl FhirGateway for FhirClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create(&self, resource_type: ResourceType, resource: Value) -> FhirResult<Value> {
        self.send(
            Method::POST,
            self.type_url(resource_type),
            &[],
            Some(&resource),
            None,
        )
        .await
    }

    async fn get(&self, resource_type: ResourceType, id: &str) -> FhirResult<Value> {
        self.send(
            Method::GET,
            self.instance_url(resource_type, id),
            &[],
            None,
            None,
        )
        .await
    }

    async fn search(
        &self,
        resource_type: ResourceType,
        params: &[(String, String)],
        token: Option<&str>,
    ) -> FhirResult<Vec<Value>> {
        let body = self
            .send(Method::GET, self.type_url(resource_type), params, None, token)
            .await?;
        Ok(normalize_search_response(body))
    }

    async fn update(
        &self,
        resource_type: ResourceType,
        id: &str,
        resource: Value,
    ) -> FhirResult<Value> {
        self.send(
            Method::PUT,
            self.instance_url(resource_type, id),
            &[],
            Some(&resource),
            None,
        )
        .await
    }

    async fn delete(&self, resource_type: ResourceType, id: &str) -> FhirResult<()> {
        self.send(
            Method::DELETE,
            self.instance_url(resource_type, id),
            &[],
            None,
            None,
        )
        .await
        .map(|_| ())
    }
}
