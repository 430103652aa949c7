//! Current session extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use carebridge_persistence::AppStorage;
use carebridge_persistence::types::FhirSession;

use crate::error::RestError;
use crate::state::AppState;

/// The session flagged current.
///
/// Rejects with [`RestError::NoSession`] (401) when no provider is
/// connected.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub FhirSession);

impl<S> FromRequestParts<AppState<S>> for CurrentSession
where
    S: AppStorage + 'static,
{
    type Rejection = RestError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        state
            .storage()
            .current_session()
            .await?
            .map(CurrentSession)
            .ok_or(RestError::NoSession)
    }
}
