//! Narrative summary handler.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use carebridge_assistant::{AssistantError, ClinicalContext};
use carebridge_persistence::AppStorage;

use crate::error::RestResult;
use crate::extractors::CurrentSession;
use crate::handlers::fhir::session_bundle;
use crate::state::AppState;

/// `POST /api/ai/narrative`
///
/// Writes a plain-language summary of the connected patient's record.
///
/// # Response
///
/// - `200 OK` - `{ "narrative", "recordTruncated", "generatedAt" }`
/// - `401 Unauthorized` - no provider connected
/// - `503 Service Unavailable` - no model configured, or the model failed
pub async fn narrative_handler<S>(
    State(state): State<AppState<S>>,
    CurrentSession(session): CurrentSession,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    if !state.assistant().is_configured() {
        return Err(AssistantError::NotConfigured.into());
    }

    let bundle = session_bundle(&state, &session).await?;
    let context = ClinicalContext::from_bundle(&bundle);
    let narrative = state.assistant().narrative(&context).await?;

    Ok(Json(serde_json::json!({
        "narrative": narrative,
        "recordTruncated": context.truncated,
        "generatedAt": Utc::now()
    }))
    .into_response())
}
