//! # carebridge-fhir - FHIR gateway and migration
//!
//! This crate holds everything Carebridge does with FHIR R4 servers:
//!
//! - [`client`] - the [`FhirGateway`] CRUD contract and its HTTP
//!   implementation [`FhirClient`], including search-response normalization
//! - [`memory`] - an in-process gateway used by the demo provider and tests
//! - [`bundle`] - per-patient [`ResourceBundle`]s and fetching them
//! - [`migration`] - copying a provider bundle into the local store
//! - [`resource`] - the resource type catalogue and loose-document helpers
//! - [`demo`] - the synthetic demo provider
//!
//! Resources are handled as loosely-typed FHIR JSON documents and are only
//! validated superficially (`resourceType`, `id`).
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use carebridge_fhir::{FhirClient, MigrationService, fetch_bundle};
//!
//! let provider = FhirClient::new("https://provider.example/fhir")?.with_bearer_token(token);
//! let local = Arc::new(FhirClient::new("http://localhost:8090/fhir")?);
//!
//! let bundle = fetch_bundle(&provider, "patient-123", None).await?;
//! let counts = MigrationService::new(local)
//!     .migrate_provider_data("session-1", &bundle.patient, &bundle)
//!     .await?;
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod bundle;
pub mod client;
pub mod demo;
pub mod error;
pub mod memory;
pub mod migration;
pub mod resource;

pub use bundle::{CHILD_TYPES, ResourceBundle, fetch_bundle};
pub use client::{FhirClient, FhirGateway, SearchParams, normalize_search_response};
pub use error::{FhirError, FhirResult, MigrationError};
pub use memory::MemoryGateway;
pub use migration::{MigrationCounts, MigrationService};
pub use resource::ResourceType;
