//! Application state for the Carebridge API.
//!
//! Handlers share the record store, the configuration, and the [`Services`]
//! that talk to FHIR servers, third-party APIs and the language model.

use std::sync::Arc;
use std::time::Duration;

use carebridge_assistant::{AssistantService, LlmClient, OpenAiClient, UnconfiguredLlm};
use carebridge_external::{AdapterConfig, ClinicalTrialsClient, NpiRegistryClient, OpenFdaClient};
use carebridge_fhir::demo::{DEMO_PROVIDER, demo_gateway};
use carebridge_fhir::{FhirClient, FhirGateway, FhirResult, MemoryGateway};
use carebridge_persistence::AppStorage;
use carebridge_persistence::types::FhirSession;
use tracing::{debug, info};

use crate::config::ServerConfig;

/// Opens the gateway a session reads its provider data through.
pub trait ProviderConnector: Send + Sync {
    /// Returns a gateway authorized for `session`'s provider.
    fn gateway(&self, session: &FhirSession) -> FhirResult<Arc<dyn FhirGateway>>;
}

/// Serves demo sessions from the built-in demo record and every other
/// session over HTTP with the session's bearer token.
pub struct DefaultConnector {
    demo: Arc<MemoryGateway>,
    timeout: Duration,
}

impl DefaultConnector {
    /// `timeout` bounds each request to a provider server.
    pub fn new(timeout: Duration) -> Self {
        Self {
            demo: Arc::new(demo_gateway()),
            timeout,
        }
    }
}

impl ProviderConnector for DefaultConnector {
    fn gateway(&self, session: &FhirSession) -> FhirResult<Arc<dyn FhirGateway>> {
        if session.provider == DEMO_PROVIDER {
            debug!(session_id = %session.id, "Using demo provider");
            let demo: Arc<dyn FhirGateway> = self.demo.clone();
            return Ok(demo);
        }

        let client = FhirClient::with_timeout(&session.fhir_server_url, self.timeout)?
            .with_bearer_token(session.access_token.clone());
        let client: Arc<dyn FhirGateway> = Arc::new(client);
        Ok(client)
    }
}

/// Outbound clients used by the handlers.
pub struct Services {
    /// The local FHIR store migrations write to.
    pub local_fhir: Arc<dyn FhirGateway>,
    /// How sessions reach their provider.
    pub connector: Arc<dyn ProviderConnector>,
    /// ClinicalTrials.gov search.
    pub trials: ClinicalTrialsClient,
    /// OpenFDA drug labels.
    pub drugs: OpenFdaClient,
    /// NPI Registry lookups.
    pub providers: NpiRegistryClient,
    /// Chat and narrative answers.
    pub assistant: AssistantService,
}

impl Services {
    /// Builds every client from configuration.
    ///
    /// Without an OpenAI key the assistant is left unconfigured; chat and
    /// narrative requests then answer 503.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let timeout = config.external_timeout();

        let local_fhir = FhirClient::new(&config.fhir_server_url)?;

        let trials = ClinicalTrialsClient::new(
            &AdapterConfig::new(
                &config.clinical_trials_url,
                Duration::from_secs(config.trials_cache_ttl),
            )
            .with_timeout(timeout),
        )?;
        let drugs = OpenFdaClient::new(
            &AdapterConfig::new(&config.openfda_url, Duration::from_secs(config.drug_cache_ttl))
                .with_timeout(timeout),
        )?;
        let providers = NpiRegistryClient::new(
            &AdapterConfig::new(&config.npi_url, Duration::from_secs(config.provider_cache_ttl))
                .with_timeout(timeout),
        )?;

        let llm: Arc<dyn LlmClient> = match config.openai_api_key() {
            Some(key) => {
                info!(model = %config.openai_model, "Assistant enabled");
                Arc::new(OpenAiClient::new(
                    &config.openai_base_url,
                    key,
                    &config.openai_model,
                )?)
            }
            None => {
                info!("OPENAI_API_KEY not set; assistant disabled");
                Arc::new(UnconfiguredLlm)
            }
        };

        Ok(Self {
            local_fhir: Arc::new(local_fhir),
            connector: Arc::new(DefaultConnector::new(config.request_timeout())),
            trials,
            drugs,
            providers,
            assistant: AssistantService::new(llm),
        })
    }

    /// Replaces the local FHIR store.
    pub fn with_local_fhir(mut self, gateway: Arc<dyn FhirGateway>) -> Self {
        self.local_fhir = gateway;
        self
    }

    /// Replaces how sessions reach their provider.
    pub fn with_connector(mut self, connector: Arc<dyn ProviderConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Replaces the language model.
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.assistant = AssistantService::new(llm);
        self
    }
}

/// Shared application state for the API.
///
/// # Example
///
/// ```rust,ignore
/// use carebridge_rest::{AppState, ServerConfig, Services};
/// use carebridge_persistence::backends::memory::MemoryBackend;
/// use std::sync::Arc;
///
/// let config = ServerConfig::for_testing();
/// let services = Services::from_config(&config)?;
/// let state = AppState::new(Arc::new(MemoryBackend::new()), config, services);
/// ```
pub struct AppState<S> {
    storage: Arc<S>,
    config: Arc<ServerConfig>,
    services: Arc<Services>,
}

// Manually implement Clone since S is wrapped in Arc and doesn't need to be Clone
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: Arc::clone(&self.config),
            services: Arc::clone(&self.services),
        }
    }
}

impl<S: AppStorage> AppState<S> {
    pub fn new(storage: Arc<S>, config: ServerConfig, services: Services) -> Self {
        Self {
            storage,
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }

    /// Returns a reference to the record store.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// The gateway for `session`'s provider.
    pub fn provider_gateway(&self, session: &FhirSession) -> FhirResult<Arc<dyn FhirGateway>> {
        self.services.connector.gateway(session)
    }

    pub fn assistant(&self) -> &AssistantService {
        &self.services.assistant
    }

    /// Days ahead of an appointment its reminder is raised.
    pub fn reminder_days(&self) -> u32 {
        self.config.reminder_days
    }
}
