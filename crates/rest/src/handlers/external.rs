//! Third-party lookup handlers.
//!
//! Upstream trouble is not an error here: the adapters answer with a
//! degraded [`Lookup`] and the handler returns it with `200 OK`.

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use carebridge_external::openfda::INTERACTION_DISCLAIMER;
use carebridge_external::{DrugInteraction, Lookup, ProviderSearchCriteria, TrialSearchCriteria};
use carebridge_persistence::AppStorage;

use crate::error::{RestError, RestResult};
use crate::extractors::{ValidJson, ValidQuery};
use crate::state::AppState;

/// Query of `GET /api/external/clinical-trials`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrialQuery {
    pub condition: Option<String>,
    pub term: Option<String>,
    pub location: Option<String>,
    /// Comma-separated overall statuses, e.g. `RECRUITING,NOT_YET_RECRUITING`.
    pub status: Option<String>,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

impl From<TrialQuery> for TrialSearchCriteria {
    fn from(query: TrialQuery) -> Self {
        let statuses = query
            .status
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        TrialSearchCriteria {
            condition: query.condition,
            term: query.term,
            location: query.location,
            statuses,
            page_size: query.page_size,
            page_token: query.page_token,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DrugQuery {
    pub name: String,
    pub limit: Option<u32>,
}

/// Body of `POST /api/external/drugs/interactions`.
#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub drugs: Vec<String>,
}

/// Interaction check result with its standing disclaimer.
#[derive(Debug, Serialize)]
pub struct InteractionReport {
    pub interactions: Vec<DrugInteraction>,
    pub disclaimer: &'static str,
}

/// Turns an answered "no such item" into a 404.
fn found<T>(lookup: Lookup<Option<T>>, entity: &str, id: &str) -> RestResult<Lookup<T>> {
    match lookup {
        Lookup::Ok { data: Some(data) } => Ok(Lookup::ok(data)),
        Lookup::Ok { data: None } => Err(RestError::not_found(entity, id)),
        Lookup::Degraded { reason } => Ok(Lookup::Degraded { reason }),
    }
}

/// `GET /api/external/clinical-trials`
pub async fn search_trials_handler<S>(
    State(state): State<AppState<S>>,
    ValidQuery(query): ValidQuery<TrialQuery>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let criteria = TrialSearchCriteria::from(query);
    let result = state.services().trials.search(&criteria).await?;
    Ok(Json(result).into_response())
}

/// `GET /api/external/clinical-trials/{nct_id}`
pub async fn get_trial_handler<S>(
    State(state): State<AppState<S>>,
    Path(nct_id): Path<String>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let lookup = state.services().trials.get_by_study_id(&nct_id).await?;
    Ok(Json(found(lookup, "clinical trial", &nct_id)?).into_response())
}

/// `GET /api/external/drugs/search?name=`
pub async fn search_drugs_handler<S>(
    State(state): State<AppState<S>>,
    ValidQuery(query): ValidQuery<DrugQuery>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let result = state
        .services()
        .drugs
        .search_drugs(&query.name, query.limit)
        .await?;
    Ok(Json(result).into_response())
}

/// `POST /api/external/drugs/interactions`
///
/// Best-effort check based on label text; the response always carries the
/// disclaimer.
pub async fn drug_interactions_handler<S>(
    State(state): State<AppState<S>>,
    ValidJson(request): ValidJson<InteractionRequest>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let result = state
        .services()
        .drugs
        .check_drug_interactions(&request.drugs)
        .await?
        .map(|interactions| InteractionReport {
            interactions,
            disclaimer: INTERACTION_DISCLAIMER,
        });
    Ok(Json(result).into_response())
}

/// `GET /api/external/providers/search`
pub async fn search_providers_handler<S>(
    State(state): State<AppState<S>>,
    ValidQuery(criteria): ValidQuery<ProviderSearchCriteria>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let result = state.services().providers.search(&criteria).await?;
    Ok(Json(result).into_response())
}

/// `GET /api/external/providers/{npi}`
pub async fn get_provider_handler<S>(
    State(state): State<AppState<S>>,
    Path(npi): Path<String>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let lookup = state.services().providers.get_by_npi(&npi).await?;
    Ok(Json(found(lookup, "provider", &npi)?).into_response())
}
