//! # carebridge-assistant - health record chat
//!
//! - [`context`] - turns a [`ResourceBundle`](carebridge_fhir::ResourceBundle)
//!   into a budgeted plain-text [`ClinicalContext`]
//! - [`llm`] - the [`LlmClient`] trait, the OpenAI client and a stand-in for
//!   when no key is configured
//! - [`service`] - [`AssistantService`], which answers questions and writes
//!   narratives
//!
//! Nothing produced here is medical advice, and the prompts say so.

#![warn(rustdoc::missing_crate_level_docs)]

pub mod context;
pub mod error;
pub mod llm;
pub mod service;

pub use context::ClinicalContext;
pub use error::{AssistantError, AssistantResult};
pub use llm::{LlmClient, LlmMessage, LlmRole, OpenAiClient, UnconfiguredLlm};
pub use service::AssistantService;
