//! SQLite backend implementation.
//!
//! Supports in-memory databases (for tests and throwaway runs) and
//! file-based databases.
//!
//! # Example
//!
//! ```no_run
//! use carebridge_persistence::backends::sqlite::SqliteBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::open("./data/carebridge.db")?;
//! backend.init_schema()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! One table per record kind (`fhir_sessions`, `chat_messages`,
//! `appointments`, `form_templates`, `prefilled_forms`, `health_alerts`,
//! `health_digests`) plus `schema_version`. Timestamps are RFC 3339 text
//! with microsecond precision; lists and maps are JSON text columns.
//! A partial unique index on `fhir_sessions(is_current)` keeps a single
//! current session.

mod backend;
mod schema;
mod storage;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use schema::SCHEMA_VERSION;
