//! Error types for the assistant.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// Errors from LLM calls.
#[derive(Error, Debug)]
pub enum AssistantError {
    /// No API key is configured, so there is no model to ask.
    #[error("the assistant is not configured")]
    NotConfigured,

    /// The model provider answered with a non-success status.
    #[error("LLM provider returned HTTP {status}")]
    Upstream { status: u16, body: String },

    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected LLM response: {message}")]
    Decode { message: String },

    /// The model answered with no content.
    #[error("LLM returned an empty response")]
    EmptyResponse,
}

impl AssistantError {
    /// Whether retrying later could help. Configuration problems cannot.
    pub fn is_transient(&self) -> bool {
        !matches!(self, AssistantError::NotConfigured)
    }
}

/// Result type for assistant operations.
pub type AssistantResult<T> = Result<T, AssistantError>;
