//! Carebridge
//!
//! Patient-facing service that connects to a provider's FHIR server, keeps a
//! local copy of the record and layers chat, scheduling and alerts on top.

use carebridge_persistence::backends::memory::MemoryBackend;
use carebridge_rest::{ServerConfig, StorageMode, create_app_with_config, init_logging};
use clap::Parser;
use tracing::{info, warn};

#[cfg(feature = "sqlite")]
use carebridge_persistence::backends::sqlite::SqliteBackend;

/// Opens the SQLite database and creates its tables.
#[cfg(feature = "sqlite")]
fn create_sqlite_backend(config: &ServerConfig) -> anyhow::Result<SqliteBackend> {
    info!(database = %config.database_url, "Initializing SQLite backend");

    let backend = if config.database_url == ":memory:" {
        SqliteBackend::in_memory()?
    } else {
        SqliteBackend::open(&config.database_url)?
    };
    backend.init_schema()?;

    Ok(backend)
}

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let storage_mode = config
        .storage_mode()
        .map_err(|e| anyhow::anyhow!("Invalid storage configuration: {}", e))?;

    info!(
        port = config.port,
        host = %config.host,
        storage = %storage_mode,
        fhir_server = %config.fhir_server_url,
        "Starting Carebridge"
    );
    if config.openai_api_key().is_none() {
        warn!("OPENAI_API_KEY is not set; chat and narrative summaries are disabled");
    }

    match storage_mode {
        StorageMode::Memory => start_memory(config).await,
        StorageMode::Sqlite => start_sqlite(config).await,
    }
}

/// Starts the server with in-process storage. Nothing survives a restart.
async fn start_memory(config: ServerConfig) -> anyhow::Result<()> {
    warn!("Using in-memory storage; data is lost on shutdown");
    let app = create_app_with_config(MemoryBackend::new(), config.clone())?;
    serve(app, &config).await
}

/// Starts the server with SQLite storage.
#[cfg(feature = "sqlite")]
async fn start_sqlite(config: ServerConfig) -> anyhow::Result<()> {
    let backend = create_sqlite_backend(&config)?;
    let app = create_app_with_config(backend, config.clone())?;
    serve(app, &config).await
}

/// Fallback when sqlite feature is not enabled.
#[cfg(not(feature = "sqlite"))]
async fn start_sqlite(_config: ServerConfig) -> anyhow::Result<()> {
    anyhow::bail!(
        "The sqlite storage requires the 'sqlite' feature. \
         Build with: cargo build -p carebridge-server --features sqlite"
    )
}
