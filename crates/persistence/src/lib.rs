//! Carebridge persistence layer.
//!
//! Stores everything Carebridge owns apart from the FHIR resources
//! themselves: provider sessions, assistant chat history, appointments,
//! intake forms, health alerts and weekly digests.
//!
//! # Backends
//!
//! - [`MemoryBackend`](backends::memory::MemoryBackend) - always available
//! - `sqlite` (default feature) - SQLite with in-memory and file modes
//!
//! Both implement every store trait in [`core`] and are interchangeable
//! behind [`AppStorage`].
//!
//! # Quick Start
//!
//! ```
//! use carebridge_persistence::backends::memory::MemoryBackend;
//! use carebridge_persistence::core::SessionStore;
//! use carebridge_persistence::types::NewFhirSession;
//!
//! # async fn example() -> carebridge_persistence::StorageResult<()> {
//! let storage = MemoryBackend::new();
//! let session = storage
//!     .create_session(NewFhirSession {
//!         provider: "demo".to_string(),
//!         fhir_server_url: "demo://local".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//! assert!(session.is_current);
//! # Ok(())
//! # }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod types;

pub use error::{BackendError, StorageError, StorageResult};

pub use core::{
    AlertStore, AppStorage, AppointmentStore, ChatStore, DigestStore, FormStore, SessionStore,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
