//! Error types for the external adapters.
//!
//! Two kinds of failure are kept apart. Caller mistakes (blank criteria, a
//! malformed NCT id or NPI) are [`ExternalError`]s and are the caller's to
//! fix. Upstream trouble is an [`UpstreamError`]; adapters never return it,
//! they log it and answer with a degraded [`Lookup`](crate::Lookup).

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// Errors returned by adapter operations.
#[derive(Error, Debug)]
pub enum ExternalError {
    /// The request parameters are unusable.
    #[error("invalid {field}: {message}")]
    InvalidCriteria { field: String, message: String },

    /// An adapter base URL could not be parsed.
    #[error("invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {message}")]
    Client { message: String },
}

impl ExternalError {
    /// Shorthand for an [`ExternalError::InvalidCriteria`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ExternalError::InvalidCriteria {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failures talking to a third-party API.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The upstream answered with a non-success status.
    #[error("upstream returned HTTP {status}")]
    Status { status: u16, body: String },

    /// The request never completed (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not what the adapter expected.
    #[error("unexpected response: {message}")]
    Decode { message: String },
}

/// Result type for adapter operations.
pub type ExternalResult<T> = Result<T, ExternalError>;
