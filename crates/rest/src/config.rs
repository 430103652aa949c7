//! Server configuration for the Carebridge API.
//!
//! Every option can be given as a command line flag or an environment
//! variable.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CAREBRIDGE_PORT` | 8080 | Server port |
//! | `CAREBRIDGE_HOST` | 127.0.0.1 | Host to bind |
//! | `CAREBRIDGE_LOG_LEVEL` | info | Log level |
//! | `CAREBRIDGE_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `CAREBRIDGE_ENABLE_CORS` | true | Enable CORS |
//! | `CAREBRIDGE_CORS_ORIGINS` | * | Allowed origins |
//! | `CAREBRIDGE_STORAGE` | sqlite | `memory` or `sqlite` |
//! | `CAREBRIDGE_DATABASE_URL` | carebridge.db | SQLite path or `:memory:` |
//! | `FHIR_SERVER_URL` | http://localhost:8090/fhir | Local FHIR store |
//! | `OPENAI_API_KEY` | - | LLM key; chat is unavailable without it |
//! | `CAREBRIDGE_OPENAI_MODEL` | gpt-4o-mini | LLM model |
//! | `CAREBRIDGE_OPENAI_BASE_URL` | https://api.openai.com/v1 | LLM API root |
//! | `JWT_SECRET` | - | Required, at least 32 characters |
//! | `CAREBRIDGE_EXTERNAL_TIMEOUT` | 10 | Third-party request timeout (seconds) |
//! | `CAREBRIDGE_TRIALS_CACHE_TTL` | 900 | ClinicalTrials.gov cache TTL (seconds) |
//! | `CAREBRIDGE_DRUG_CACHE_TTL` | 3600 | OpenFDA cache TTL (seconds) |
//! | `CAREBRIDGE_PROVIDER_CACHE_TTL` | 3600 | NPI Registry cache TTL (seconds) |
//! | `CAREBRIDGE_CLINICAL_TRIALS_URL` | ClinicalTrials.gov v2 | Adapter base URL |
//! | `CAREBRIDGE_OPENFDA_URL` | api.fda.gov | Adapter base URL |
//! | `CAREBRIDGE_NPI_URL` | NPI Registry | Adapter base URL |
//! | `CAREBRIDGE_REMINDER_DAYS` | 2 | Appointment reminder lead time (days) |
//!
//! # Example
//!
//! ```rust
//! use carebridge_rest::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     jwt_secret: Some("0123456789abcdef0123456789abcdef".to_string()),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

/// Minimum length of `JWT_SECRET`.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Largest accepted `reminder_days`.
pub const MAX_REMINDER_DAYS: u32 = 365;

/// Where application records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Process memory; records are lost on restart.
    Memory,
    /// A SQLite database file.
    Sqlite,
}

impl StorageMode {
    /// The name accepted by `--storage`.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Memory => "memory",
            StorageMode::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageMode::Memory),
            "sqlite" => Ok(StorageMode::Sqlite),
            other => Err(format!(
                "Unknown storage mode '{}' (expected memory or sqlite)",
                other
            )),
        }
    }
}

/// Server configuration for the Carebridge API.
#[derive(Clone, Parser)]
#[command(name = "carebridge")]
#[command(about = "Carebridge health record aggregation API")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "CAREBRIDGE_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "CAREBRIDGE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "CAREBRIDGE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in seconds.
    #[arg(long, env = "CAREBRIDGE_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "CAREBRIDGE_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "CAREBRIDGE_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Storage backend (memory or sqlite).
    #[arg(long, env = "CAREBRIDGE_STORAGE", default_value = "sqlite")]
    pub storage: String,

    /// SQLite database path, or `:memory:`.
    #[arg(long, env = "CAREBRIDGE_DATABASE_URL", default_value = "carebridge.db")]
    pub database_url: String,

    /// Base URL of the local FHIR store that migrations write to.
    #[arg(
        long,
        env = "FHIR_SERVER_URL",
        default_value = "http://localhost:8090/fhir"
    )]
    pub fhir_server_url: String,

    /// OpenAI API key. The assistant is unavailable without one.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Chat completion model.
    #[arg(long, env = "CAREBRIDGE_OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub openai_model: String,

    /// OpenAI-compatible API root.
    #[arg(
        long,
        env = "CAREBRIDGE_OPENAI_BASE_URL",
        default_value = "https://api.openai.com/v1"
    )]
    pub openai_base_url: String,

    /// Token signing secret; must be at least 32 characters.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Timeout for third-party lookups in seconds.
    #[arg(long, env = "CAREBRIDGE_EXTERNAL_TIMEOUT", default_value = "10")]
    pub external_timeout: u64,

    /// ClinicalTrials.gov cache TTL in seconds.
    #[arg(long, env = "CAREBRIDGE_TRIALS_CACHE_TTL", default_value = "900")]
    pub trials_cache_ttl: u64,

    /// OpenFDA cache TTL in seconds.
    #[arg(long, env = "CAREBRIDGE_DRUG_CACHE_TTL", default_value = "3600")]
    pub drug_cache_ttl: u64,

    /// NPI Registry cache TTL in seconds.
    #[arg(long, env = "CAREBRIDGE_PROVIDER_CACHE_TTL", default_value = "3600")]
    pub provider_cache_ttl: u64,

    /// ClinicalTrials.gov API root.
    #[arg(
        long,
        env = "CAREBRIDGE_CLINICAL_TRIALS_URL",
        default_value = carebridge_external::clinical_trials::DEFAULT_BASE_URL
    )]
    pub clinical_trials_url: String,

    /// OpenFDA API root.
    #[arg(
        long,
        env = "CAREBRIDGE_OPENFDA_URL",
        default_value = carebridge_external::openfda::DEFAULT_BASE_URL
    )]
    pub openfda_url: String,

    /// NPI Registry API root.
    #[arg(
        long,
        env = "CAREBRIDGE_NPI_URL",
        default_value = carebridge_external::npi::DEFAULT_BASE_URL
    )]
    pub npi_url: String,

    /// Days ahead of an appointment to raise its reminder.
    #[arg(long, env = "CAREBRIDGE_REMINDER_DAYS", default_value = "2")]
    pub reminder_days: u32,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("host", &self.host)
            .field("log_level", &self.log_level)
            .field("request_timeout", &self.request_timeout)
            .field("enable_cors", &self.enable_cors)
            .field("cors_origins", &self.cors_origins)
            .field("storage", &self.storage)
            .field("database_url", &self.database_url)
            .field("fhir_server_url", &self.fhir_server_url)
            .field("openai_api_key", &redacted(&self.openai_api_key))
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("jwt_secret", &redacted(&self.jwt_secret))
            .field("external_timeout", &self.external_timeout)
            .field("reminder_days", &self.reminder_days)
            .finish_non_exhaustive()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            storage: "sqlite".to_string(),
            database_url: "carebridge.db".to_string(),
            fhir_server_url: "http://localhost:8090/fhir".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            jwt_secret: None,
            external_timeout: 10,
            trials_cache_ttl: 900,
            drug_cache_ttl: 3600,
            provider_cache_ttl: 3600,
            clinical_trials_url: carebridge_external::clinical_trials::DEFAULT_BASE_URL.to_string(),
            openfda_url: carebridge_external::openfda::DEFAULT_BASE_URL.to_string(),
            npi_url: carebridge_external::npi::DEFAULT_BASE_URL.to_string(),
            reminder_days: 2,
        }
    }
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables.
    pub fn from_env() -> Self {
        Self::try_parse().unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured storage backend.
    pub fn storage_mode(&self) -> Result<StorageMode, String> {
        self.storage.parse()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout)
    }

    /// The OpenAI key, if one is set and not blank.
    pub fn openai_api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Validates the configuration, reporting every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.external_timeout == 0 {
            errors.push("External timeout cannot be 0".to_string());
        }

        if self.reminder_days > MAX_REMINDER_DAYS {
            errors.push(format!(
                "Reminder days cannot exceed {}",
                MAX_REMINDER_DAYS
            ));
        }

        match self.jwt_secret.as_deref().map(str::trim) {
            None | Some("") => errors.push("JWT_SECRET is required".to_string()),
            Some(secret) if secret.chars().count() < MIN_JWT_SECRET_LEN => errors.push(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_JWT_SECRET_LEN
            )),
            Some(_) => {}
        }

        match self.storage_mode() {
            Ok(StorageMode::Sqlite) if self.database_url.trim().is_empty() => {
                errors.push("Database URL cannot be empty for sqlite storage".to_string());
            }
            Ok(_) => {}
            Err(e) => errors.push(e),
        }

        let urls = [
            ("FHIR server URL", &self.fhir_server_url),
            ("OpenAI base URL", &self.openai_base_url),
            ("ClinicalTrials.gov URL", &self.clinical_trials_url),
            ("OpenFDA URL", &self.openfda_url),
            ("NPI Registry URL", &self.npi_url),
        ];
        for (name, value) in urls {
            if let Err(e) = url::Url::parse(value) {
                errors.push(format!("Invalid {} '{}': {}", name, value, e));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a valid configuration suitable for testing.
    ///
    /// Uses in-memory storage, disables CORS and leaves the assistant
    /// unconfigured.
    pub fn for_testing() -> Self {
        Self {
            log_level: "debug".to_string(),
            request_timeout: 5,
            enable_cors: false,
            storage: "memory".to_string(),
            database_url: ":memory:".to_string(),
            jwt_secret: Some("test-secret-that-is-at-least-32-chars".to_string()),
            ..Default::default()
        }
    }
}
