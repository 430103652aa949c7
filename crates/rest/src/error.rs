//! Error types for the Carebridge API.
//!
//! Every error becomes an OperationOutcome-shaped JSON body with a matching
//! HTTP status.
//!
//! # Error Mapping
//!
//! | Error | HTTP Status | Issue Code |
//! |-------|-------------|------------|
//! | Validation / BadRequest | 400 | invalid |
//! | NoSession | 401 | login |
//! | NotFound | 404 | not-found |
//! | ServiceUnavailable | 503 | transient |
//! | InternalError | 500 | exception |
//!
//! Internal errors carry their detail for the log only; the client sees a
//! generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use carebridge_assistant::AssistantError;
use carebridge_external::ExternalError;
use carebridge_fhir::{FhirError, MigrationError};
use carebridge_persistence::StorageError;
use std::fmt;
use tracing::{error, warn};

/// Text returned to clients for every internal error.
pub const INTERNAL_ERROR_TEXT: &str = "An unexpected error occurred";

/// A problem with one request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Request field the issue is about, e.g. `fhirServerUrl`.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl FieldIssue {
    /// Creates an issue for `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The error type for API handlers.
#[derive(Debug)]
pub enum RestError {
    /// One or more request fields are invalid (HTTP 400).
    Validation {
        /// Every invalid field, in request order.
        issues: Vec<FieldIssue>,
    },

    /// The request could not be understood (HTTP 400).
    BadRequest {
        /// Explanation returned to the client.
        message: String,
    },

    /// No provider session is connected (HTTP 401).
    NoSession,

    /// An entity does not exist (HTTP 404).
    NotFound {
        /// Kind of entity, e.g. `Appointment`.
        entity: String,
        /// The id that was looked up.
        id: String,
    },

    /// A dependency is unavailable or not configured (HTTP 503).
    ServiceUnavailable {
        /// Which dependency is missing and why.
        message: String,
    },

    /// Anything else (HTTP 500). `message` is logged, never returned.
    InternalError {
        /// Detail for the server log.
        message: String,
    },
}

impl RestError {
    /// Shorthand for a single-field validation error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        RestError::Validation {
            issues: vec![FieldIssue::new(field, message)],
        }
    }

    /// Shorthand for [`RestError::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        RestError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Shorthand for [`RestError::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        RestError::InternalError {
            message: message.into(),
        }
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::Validation { .. } | RestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RestError::NoSession => StatusCode::UNAUTHORIZED,
            RestError::NotFound { .. } => StatusCode::NOT_FOUND,
            RestError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            RestError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::Validation { issues } => {
                let fields: Vec<_> = issues
                    .iter()
                    .map(|i| format!("{}: {}", i.field, i.message))
                    .collect();
                write!(f, "Validation failed: {}", fields.join("; "))
            }
            RestError::BadRequest { message } => write!(f, "Bad request: {}", message),
            RestError::NoSession => write!(f, "No provider session is connected"),
            RestError::NotFound { entity, id } => write!(f, "{} not found: {}", entity, id),
            RestError::ServiceUnavailable { message } => {
                write!(f, "Service unavailable: {}", message)
            }
            RestError::InternalError { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let outcome = match &self {
            RestError::Validation { issues } => {
                let issues: Vec<_> = issues
                    .iter()
                    .map(|i| {
                        serde_json::json!({
                            "severity": "error",
                            "code": "invalid",
                            "details": { "text": i.message },
                            "expression": [i.field]
                        })
                    })
                    .collect();
                serde_json::json!({
                    "resourceType": "OperationOutcome",
                    "issue": issues
                })
            }
            RestError::BadRequest { message } => {
                create_operation_outcome("error", "invalid", message)
            }
            RestError::NoSession => create_operation_outcome(
                "error",
                "login",
                "No provider session is connected. Connect a provider first.",
            ),
            RestError::NotFound { entity, id } => create_operation_outcome(
                "error",
                "not-found",
                &format!("{} {} not found", entity, id),
            ),
            RestError::ServiceUnavailable { message } => {
                create_operation_outcome("error", "transient", message)
            }
            RestError::InternalError { message } => {
                error!(error = %message, "Internal error while handling request");
                create_operation_outcome("error", "exception", INTERNAL_ERROR_TEXT)
            }
        };

        (status, Json(outcome)).into_response()
    }
}

/// Creates an OperationOutcome with a single issue.
fn create_operation_outcome(severity: &str, code: &str, details: &str) -> serde_json::Value {
    serde_json::json!({
        "resourceType": "OperationOutcome",
        "issue": [{
            "severity": severity,
            "code": code,
            "details": {
                "text": details
            }
        }]
    })
}

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => RestError::NotFound {
                entity: entity.to_string(),
                id,
            },
            StorageError::Validation { field, message } => RestError::invalid(field, message),
            StorageError::Backend(e) => RestError::internal(e.to_string()),
        }
    }
}

impl From<ExternalError> for RestError {
    fn from(err: ExternalError) -> Self {
        match err {
            ExternalError::InvalidCriteria { field, message } => RestError::invalid(field, message),
            ExternalError::InvalidBaseUrl { .. } | ExternalError::Client { .. } => {
                RestError::internal(err.to_string())
            }
        }
    }
}

/// Gateway failures are never shown to the client. Handlers that turn a
/// provider 404 into a 404 of their own check for it before converting.
impl From<FhirError> for RestError {
    fn from(err: FhirError) -> Self {
        RestError::internal(err.to_string())
    }
}

impl From<MigrationError> for RestError {
    fn from(err: MigrationError) -> Self {
        RestError::internal(err.to_string())
    }
}

impl From<AssistantError> for RestError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::NotConfigured => RestError::ServiceUnavailable {
                message: "The assistant is not configured".to_string(),
            },
            other => {
                warn!(error = %other, "Assistant request failed");
                RestError::ServiceUnavailable {
                    message: "The assistant is temporarily unavailable".to_string(),
                }
            }
        }
    }
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        RestError::BadRequest {
            message: format!("Invalid JSON: {}", err),
        }
    }
}

/// Result type alias for API handlers.
pub type RestResult<T> = Result<T, RestError>;
