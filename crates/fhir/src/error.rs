//! Error types for FHIR gateway and migration operations.

use thiserror::Error;

/// Errors raised by a [`FhirGateway`](crate::client::FhirGateway).
///
/// Gateway errors are not classified beyond these variants. Callers are
/// expected to translate them into a generic failure for their own clients.
#[derive(Error, Debug)]
pub enum FhirError {
    /// The server answered with a non-success status.
    #[error("FHIR server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response (connect, timeout, TLS).
    #[error("FHIR request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("failed to decode FHIR response: {message}")]
    Decode { message: String },

    /// A resource failed superficial validation.
    #[error("invalid {resource_type} resource: {message}")]
    InvalidResource {
        resource_type: String,
        message: String,
    },

    /// The configured base URL could not be parsed.
    #[error("invalid FHIR base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    /// Failure injected or reported by an in-process gateway.
    #[error("gateway failure: {message}")]
    Gateway { message: String },
}

impl FhirError {
    /// Returns true when the server reported that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FhirError::Status { status: 404, .. })
    }
}

/// Errors raised while copying a provider bundle into the local store.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// The source Patient failed validation.
    #[error("source patient is invalid: {0}")]
    InvalidPatient(#[source] FhirError),

    /// Creating the Patient in the destination failed.
    #[error("failed to create destination patient: {0}")]
    PatientCreate(#[source] FhirError),

    /// The destination accepted the Patient but returned no id.
    #[error("destination store returned a patient without an id")]
    MissingPatientId,

    /// Creating a child resource failed; the migration stopped there.
    #[error("failed to create {resource_type} #{index}: {source}")]
    Create {
        resource_type: String,
        index: usize,
        #[source]
        source: FhirError,
    },
}

/// Result alias for gateway operations.
pub type FhirResult<T> = Result<T, FhirError>;
