//! API test harness.
//!
//! Builds the full application over [`MemoryBackend`], a [`MemoryGateway`]
//! standing in for the local FHIR server and a scripted model. External
//! adapters point at a closed local port so every lookup degrades.

use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use carebridge_assistant::{AssistantError, AssistantResult, LlmClient, LlmMessage};
use carebridge_fhir::{FhirGateway, MemoryGateway};
use carebridge_persistence::backends::memory::MemoryBackend;
use carebridge_rest::{AppState, ServerConfig, Services, create_app_with_state};
use parking_lot::Mutex;
use serde_json::{Value, json};

/// Address nothing listens on.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

/// Model double that answers with a fixed reply and records its prompts.
#[derive(Debug)]
pub struct ScriptedLlm {
    reply: Option<String>,
    configured: bool,
    prompts: Mutex<Vec<Vec<LlmMessage>>>,
}

impl ScriptedLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            configured: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A configured model whose every call fails upstream.
    pub fn failing() -> Self {
        Self {
            reply: None,
            configured: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            reply: None,
            configured: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn last_prompt(&self) -> Vec<LlmMessage> {
        self.prompts.lock().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, messages: &[LlmMessage]) -> AssistantResult<String> {
        self.prompts.lock().push(messages.to_vec());
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None if !self.configured => Err(AssistantError::NotConfigured),
            None => Err(AssistantError::Upstream {
                status: 502,
                body: "bad gateway".to_string(),
            }),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

/// A running test application.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<MemoryBackend>,
    pub local_fhir: Arc<MemoryGateway>,
    pub llm: Arc<ScriptedLlm>,
}

/// Configuration used by every test app.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        clinical_trials_url: UNREACHABLE_URL.to_string(),
        openfda_url: UNREACHABLE_URL.to_string(),
        npi_url: UNREACHABLE_URL.to_string(),
        external_timeout: 2,
        ..ServerConfig::for_testing()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_llm(ScriptedLlm::replying("Your record looks stable."))
    }

    pub fn with_llm(llm: ScriptedLlm) -> Self {
        let local_fhir = Arc::new(MemoryGateway::new("http://local.fhir.test/fhir"));
        Self::build(test_config(), llm, local_fhir.clone(), local_fhir)
    }

    pub fn with_local_fhir(local_fhir: MemoryGateway) -> Self {
        let local_fhir = Arc::new(local_fhir);
        Self::build(
            test_config(),
            ScriptedLlm::replying("ok"),
            local_fhir.clone(),
            local_fhir,
        )
    }

    /// Builds an app whose local FHIR store is reached through `wrap`.
    ///
    /// `local_fhir` still sees every write, so tests can inspect it while
    /// the app talks to the wrapping gateway.
    pub fn with_wrapped_local_fhir(
        config: ServerConfig,
        wrap: impl FnOnce(Arc<MemoryGateway>) -> Arc<dyn FhirGateway>,
    ) -> Self {
        let local_fhir = Arc::new(MemoryGateway::new("http://local.fhir.test/fhir"));
        let gateway = wrap(local_fhir.clone());
        Self::build(config, ScriptedLlm::replying("ok"), local_fhir, gateway)
    }

    fn build(
        config: ServerConfig,
        llm: ScriptedLlm,
        local_fhir: Arc<MemoryGateway>,
        gateway: Arc<dyn FhirGateway>,
    ) -> Self {
        let storage = Arc::new(MemoryBackend::new());
        let llm = Arc::new(llm);

        let services = Services::from_config(&config)
            .expect("Failed to build services")
            .with_local_fhir(gateway)
            .with_llm(llm.clone());

        let state = AppState::new(Arc::clone(&storage), config, services);
        let server =
            TestServer::new(create_app_with_state(state)).expect("Failed to create test server");

        Self {
            server,
            storage,
            local_fhir,
            llm,
        }
    }

    /// Connects the demo provider and returns the session body.
    pub async fn connect_demo(&self) -> Value {
        let response = self
            .server
            .post("/api/fhir/sessions")
            .json(&json!({ "provider": "demo" }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }
}
