//! # carebridge-external - third-party health data lookups
//!
//! Adapters for public health APIs:
//!
//! - [`clinical_trials`] - ClinicalTrials.gov study search and lookup
//! - [`openfda`] - OpenFDA drug labels and a label-text interaction check
//! - [`npi`] - NPI Registry provider search and lookup
//!
//! Every adapter caches successful answers in a [`TtlCache`] and reports
//! upstream trouble as a [`Lookup::Degraded`] result rather than an error.
//! Only caller mistakes are errors ([`ExternalError::InvalidCriteria`]).
//!
//! ```rust,ignore
//! use carebridge_external::{ClinicalTrialsClient, Lookup, TrialSearchCriteria};
//!
//! let trials = ClinicalTrialsClient::new(&ClinicalTrialsClient::default_config())?;
//! let criteria = TrialSearchCriteria {
//!     condition: Some("type 2 diabetes".into()),
//!     ..Default::default()
//! };
//! match trials.search(&criteria).await? {
//!     Lookup::Ok { data } => println!("{} trials", data.total_count),
//!     Lookup::Degraded { reason } => println!("try later: {reason}"),
//! }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod cache;
pub mod clinical_trials;
pub mod error;
mod http;
pub mod lookup;
pub mod npi;
pub mod openfda;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache, cache_key};
pub use clinical_trials::{ClinicalTrial, ClinicalTrialsClient, TrialSearchCriteria, TrialSearchResult};
pub use error::{ExternalError, ExternalResult, UpstreamError};
pub use http::{AdapterConfig, DEFAULT_TIMEOUT};
pub use lookup::Lookup;
pub use npi::{NpiRegistryClient, Provider, ProviderKind, ProviderSearchCriteria, ProviderSearchResult};
pub use openfda::{
    DrugInteraction, DrugLabel, DrugSearchResult, InteractionSeverity, OpenFdaClient,
    classify_severity,
};
