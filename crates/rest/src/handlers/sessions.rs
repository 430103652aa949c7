//! Provider session handlers.
//!
//! Connecting creates the single current session; ending it returns the
//! service to the no-session state. Migration copies the connected
//! patient's record into the local FHIR store.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use carebridge_fhir::demo::{DEMO_PATIENT_ID, DEMO_PROVIDER, DEMO_SERVER_URL};
use carebridge_fhir::{MigrationService, fetch_bundle};
use carebridge_persistence::AppStorage;
use carebridge_persistence::types::{FhirSession, NewFhirSession};

use crate::error::{FieldIssue, RestError, RestResult};
use crate::extractors::{CurrentSession, ValidJson};
use crate::state::AppState;

/// Access token recorded on demo sessions.
const DEMO_ACCESS_TOKEN: &str = "demo-access-token";

/// Body of `POST /api/fhir/sessions`.
///
/// For the `demo` provider only `provider` is needed. Every other provider
/// must supply the token, server URL and patient id obtained during its
/// SMART authorization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub provider: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Token lifetime in seconds; used when `tokenExpiresAt` is absent.
    pub expires_in: Option<i64>,
    pub fhir_server_url: Option<String>,
    pub patient_id: Option<String>,
    pub scope: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ConnectRequest {
    /// Validates the request, reporting every bad field at once.
    pub fn into_new_session(self, now: DateTime<Utc>) -> RestResult<NewFhirSession> {
        let mut issues = Vec::new();

        let Some(provider) = non_blank(self.provider) else {
            return Err(RestError::invalid("provider", "provider is required"));
        };

        let token_expires_at = match (self.token_expires_at, self.expires_in) {
            (Some(at), _) => Some(at),
            (None, Some(seconds)) if seconds > 0 => {
                let expires_at = Duration::try_seconds(seconds)
                    .and_then(|lifetime| now.checked_add_signed(lifetime));
                if expires_at.is_none() {
                    issues.push(FieldIssue::new("expiresIn", "is too large"));
                }
                expires_at
            }
            (None, Some(_)) => {
                issues.push(FieldIssue::new("expiresIn", "must be a positive number of seconds"));
                None
            }
            (None, None) => None,
        };

        if provider == DEMO_PROVIDER {
            if !issues.is_empty() {
                return Err(RestError::Validation { issues });
            }
            return Ok(NewFhirSession {
                provider,
                access_token: non_blank(self.access_token)
                    .unwrap_or_else(|| DEMO_ACCESS_TOKEN.to_string()),
                refresh_token: non_blank(self.refresh_token),
                token_expires_at,
                fhir_server_url: DEMO_SERVER_URL.to_string(),
                patient_id: Some(DEMO_PATIENT_ID.to_string()),
                scope: non_blank(self.scope),
            });
        }

        let access_token = non_blank(self.access_token);
        if access_token.is_none() {
            issues.push(FieldIssue::new("accessToken", "access token is required"));
        }

        let fhir_server_url = non_blank(self.fhir_server_url);
        match fhir_server_url.as_deref().map(url::Url::parse) {
            None => issues.push(FieldIssue::new("fhirServerUrl", "FHIR server URL is required")),
            Some(Ok(url)) if matches!(url.scheme(), "http" | "https") => {}
            Some(Ok(_)) => issues.push(FieldIssue::new(
                "fhirServerUrl",
                "FHIR server URL must use http or https",
            )),
            Some(Err(e)) => issues.push(FieldIssue::new(
                "fhirServerUrl",
                format!("invalid FHIR server URL: {}", e),
            )),
        }

        let patient_id = non_blank(self.patient_id);
        if patient_id.is_none() {
            issues.push(FieldIssue::new("patientId", "patient id is required"));
        }

        match (access_token, fhir_server_url) {
            (Some(access_token), Some(fhir_server_url)) if issues.is_empty() => Ok(NewFhirSession {
                provider,
                access_token,
                refresh_token: non_blank(self.refresh_token),
                token_expires_at,
                fhir_server_url,
                patient_id,
                scope: non_blank(self.scope),
            }),
            _ => Err(RestError::Validation { issues }),
        }
    }
}

/// `GET /api/fhir/sessions`
pub async fn list_sessions_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let sessions = state.storage().list_sessions().await?;
    Ok(Json(sessions).into_response())
}

/// `POST /api/fhir/sessions`
///
/// Creates the new current session, ending any previous one.
///
/// # Response
///
/// - `201 Created` - the session (tokens are never returned)
/// - `400 Bad Request` - one issue per invalid field
pub async fn connect_handler<S>(
    State(state): State<AppState<S>>,
    ValidJson(request): ValidJson<ConnectRequest>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let new_session = request.into_new_session(Utc::now())?;
    let session = state.storage().create_session(new_session).await?;

    info!(
        session_id = %session.id,
        provider = %session.provider,
        "Provider session connected"
    );

    Ok((StatusCode::CREATED, Json(session)).into_response())
}

/// `GET /api/fhir/sessions/current`
pub async fn current_session_handler(CurrentSession(session): CurrentSession) -> Response {
    Json(session).into_response()
}

/// `DELETE /api/fhir/sessions/current`
pub async fn end_current_session_handler<S>(
    State(state): State<AppState<S>>,
    CurrentSession(session): CurrentSession,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let ended = state.storage().end_session(&session.id).await?;
    info!(session_id = %ended.id, "Provider session ended");
    Ok(Json(ended).into_response())
}

/// `DELETE /api/fhir/sessions/{id}`
pub async fn end_session_handler<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let ended = state.storage().end_session(&id).await?;
    info!(session_id = %ended.id, "Provider session ended");
    Ok(Json(ended).into_response())
}

/// `POST /api/fhir/sessions/current/migrate`
///
/// Fetches the connected patient's record from the provider, copies it into
/// the local FHIR store and records the per-type counts on the session.
/// A failed copy leaves the session unmigrated; resources created before the
/// failure stay in the local store.
///
/// The copy runs on its own task. A request timeout or a dropped connection
/// ends the response but not the migration, which still completes and is
/// recorded on the session.
pub async fn migrate_handler<S>(
    State(state): State<AppState<S>>,
    CurrentSession(session): CurrentSession,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let session_id = session.id.clone();
    let migration = tokio::spawn(migrate_session(state, session));
    let body = migration.await.map_err(|e| {
        RestError::internal(format!("migration task for session {} failed: {}", session_id, e))
    })??;

    Ok(Json(body).into_response())
}

async fn migrate_session<S>(state: AppState<S>, session: FhirSession) -> RestResult<Value>
where
    S: AppStorage + 'static,
{
    let patient_id = session
        .patient_id
        .as_deref()
        .ok_or_else(|| RestError::BadRequest {
            message: "The connected session has no patient".to_string(),
        })?;

    let gateway = state.provider_gateway(&session)?;
    let bundle = fetch_bundle(gateway.as_ref(), patient_id, None).await?;

    let migration = MigrationService::new(state.services().local_fhir.clone());
    let counts = migration
        .migrate_provider_data(&session.id, &bundle.patient, &bundle)
        .await?;

    let session = state
        .storage()
        .record_migration(&session.id, counts.as_map().clone())
        .await?;

    info!(
        session_id = %session.id,
        total = counts.total(),
        "Provider record migrated"
    );

    Ok(json!({
        "session": session,
        "counts": counts.as_map(),
        "total": counts.total()
    }))
}
