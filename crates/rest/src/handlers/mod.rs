//! HTTP request handlers.
//!
//! - [`health`] - health check
//! - [`sessions`] - provider connect, disconnect and migration
//! - [`fhir`] - patient bundle and proxied provider reads
//! - [`chat`] - health assistant chat
//! - [`ai`] - narrative summaries
//! - [`external`] - ClinicalTrials.gov, OpenFDA and NPI Registry lookups
//! - [`scheduling`] - appointments and forms
//! - [`alerts`] - alerts and weekly digests

pub mod ai;
pub mod alerts;
pub mod chat;
pub mod external;
pub mod fhir;
pub mod health;
pub mod scheduling;
pub mod sessions;

pub use health::health_handler;
