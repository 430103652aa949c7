//! # carebridge-rest - Carebridge HTTP API
//!
//! Axum application for the Carebridge patient record service. A patient
//! connects one provider session at a time, reads and migrates their record,
//! asks the health assistant about it, looks up trials, drugs and clinicians,
//! and keeps appointments, prefilled forms, alerts and weekly digests.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use carebridge_rest::{create_app_with_config, ServerConfig};
//! use carebridge_persistence::backends::sqlite::SqliteBackend;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::open("carebridge.db")?;
//!     backend.init_schema()?;
//!
//!     let app = create_app_with_config(backend, ServerConfig::from_env())?;
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every error is returned as an OperationOutcome-shaped JSON body:
//!
//! | HTTP Status | Issue Code | Description |
//! |-------------|------------|-------------|
//! | 400 | invalid | Validation error, one issue per field |
//! | 401 | login | No current provider session |
//! | 404 | not-found | Unknown entity |
//! | 503 | transient | Assistant unavailable |
//! | 500 | exception | Internal error (details are only logged) |
//!
//! Third-party lookups never fail with 5xx: upstream trouble is reported as
//! a `degraded` lookup result.
//!
//! ## Architecture
//!
//! - [`config`] - Server configuration
//! - [`error`] - Error types and response bodies
//! - [`state`] - Application state (storage, configuration, services)
//! - [`extractors`] - JSON body and current-session extractors
//! - [`handlers`] - HTTP request handlers
//! - [`services`] - Reminders, digests and form prefill
//! - [`routing`] - Route configuration

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod extractors;
#[allow(missing_docs)]
pub mod handlers;
pub mod routing;
pub mod services;
pub mod state;

pub use config::{ServerConfig, StorageMode};
pub use error::{RestError, RestResult};
pub use state::{AppState, DefaultConnector, ProviderConnector, Services};

use std::sync::Arc;

use axum::Router;
use carebridge_persistence::AppStorage;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application from a storage backend and configuration.
///
/// Service clients are built from the configuration; use
/// [`create_app_with_state`] to supply them yourself.
pub fn create_app_with_config<S>(storage: S, config: ServerConfig) -> anyhow::Result<Router>
where
    S: AppStorage,
{
    let services = Services::from_config(&config)?;
    let state = AppState::new(Arc::new(storage), config, services);
    Ok(create_app_with_state(state))
}

/// Creates the Axum application from prepared state.
pub fn create_app_with_state<S>(state: AppState<S>) -> Router
where
    S: AppStorage,
{
    info!(
        backend = state.storage().backend_name(),
        assistant = state.assistant().is_configured(),
        "Creating Carebridge API"
    );

    let config = state.config().clone();
    let router = routing::create_routes(state);

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ));

    let router = if config.enable_cors {
        router.layer(build_cors_layer(&config))
    } else {
        router
    };

    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.cors_origins.trim() == "*" {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` overrides
/// `level` when set.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "carebridge_rest={level},carebridge_fhir={level},carebridge_external={level},\
             carebridge_assistant={level},carebridge_persistence={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
