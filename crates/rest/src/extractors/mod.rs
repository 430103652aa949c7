//! Axum extractors for Carebridge requests.
//!
//! - [`ValidJson`] - JSON bodies whose rejections become OperationOutcomes
//! - [`ValidQuery`] - query strings, rejected the same way
//! - [`CurrentSession`] - the connected provider session, or 401

mod json;
mod query;
mod session;

pub use json::ValidJson;
pub use query::ValidQuery;
pub use session::CurrentSession;
