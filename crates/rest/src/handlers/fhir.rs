//! Provider data handlers.
//!
//! Reads go to the connected session's provider; nothing here touches the
//! local FHIR store.

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::debug;

use carebridge_fhir::{ResourceBundle, ResourceType, fetch_bundle};
use carebridge_persistence::AppStorage;
use carebridge_persistence::types::FhirSession;

use crate::error::{RestError, RestResult};
use crate::extractors::{CurrentSession, ValidQuery};
use crate::state::AppState;

fn patient_id(session: &FhirSession) -> RestResult<&str> {
    session
        .patient_id
        .as_deref()
        .ok_or_else(|| RestError::BadRequest {
            message: "The connected session has no patient".to_string(),
        })
}

fn parse_resource_type(resource_type: &str) -> RestResult<ResourceType> {
    resource_type.parse().map_err(|_| {
        RestError::invalid(
            "resourceType",
            format!("Unsupported resource type: {}", resource_type),
        )
    })
}

/// Fetches the connected patient's full record from their provider.
pub(crate) async fn session_bundle<S>(
    state: &AppState<S>,
    session: &FhirSession,
) -> RestResult<ResourceBundle>
where
    S: AppStorage + 'static,
{
    let gateway = state.provider_gateway(session)?;
    Ok(fetch_bundle(gateway.as_ref(), patient_id(session)?, None).await?)
}

/// Adds `patient=<id>` to a search of a patient-compartment type unless the
/// caller already scoped it.
pub fn scope_to_patient(
    resource_type: ResourceType,
    mut params: Vec<(String, String)>,
    patient_id: Option<&str>,
) -> Vec<(String, String)> {
    let scoped = params
        .iter()
        .any(|(name, _)| name == "patient" || name == "subject");
    if let (true, false, Some(id)) = (resource_type.is_patient_compartment(), scoped, patient_id) {
        params.push(("patient".to_string(), id.to_string()));
    }
    params
}

/// Wraps search results in a `searchset` Bundle.
fn searchset(resources: Vec<Value>) -> Value {
    let entries: Vec<Value> = resources
        .into_iter()
        .map(|resource| serde_json::json!({ "resource": resource }))
        .collect();
    serde_json::json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "total": entries.len(),
        "entry": entries
    })
}

/// `GET /api/fhir/bundle`
pub async fn bundle_handler<S>(
    State(state): State<AppState<S>>,
    CurrentSession(session): CurrentSession,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let bundle = session_bundle(&state, &session).await?;
    Ok(Json(bundle).into_response())
}

/// `GET /api/fhir/{resource_type}`
///
/// Proxies a search to the provider. Searches of patient-compartment types
/// are scoped to the connected patient when no `patient` or `subject`
/// parameter is given.
pub async fn search_handler<S>(
    State(state): State<AppState<S>>,
    CurrentSession(session): CurrentSession,
    Path(resource_type): Path<String>,
    ValidQuery(params): ValidQuery<Vec<(String, String)>>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let resource_type = parse_resource_type(&resource_type)?;
    let params = scope_to_patient(resource_type, params, session.patient_id.as_deref());

    debug!(resource_type = %resource_type, params = params.len(), "Proxying search");

    let gateway = state.provider_gateway(&session)?;
    let resources = gateway.search(resource_type, &params, None).await?;
    Ok(Json(searchset(resources)).into_response())
}

/// `GET /api/fhir/{resource_type}/{id}`
///
/// # Response
///
/// - `200 OK` - the provider's resource
/// - `404 Not Found` - the provider does not have it
pub async fn read_handler<S>(
    State(state): State<AppState<S>>,
    CurrentSession(session): CurrentSession,
    Path((resource_type, id)): Path<(String, String)>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let resource_type = parse_resource_type(&resource_type)?;
    let gateway = state.provider_gateway(&session)?;

    match gateway.get(resource_type, &id).await {
        Ok(resource) => Ok(Json(resource).into_response()),
        Err(e) if e.is_not_found() => Err(RestError::not_found(resource_type.as_str(), id)),
        Err(e) => Err(e.into()),
    }
}
