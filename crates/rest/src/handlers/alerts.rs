//! Health alert and digest handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use carebridge_persistence::AppStorage;
use carebridge_persistence::types::now;

use crate::error::RestResult;
use crate::extractors::ValidQuery;
use crate::services::{generate_appointment_reminders, generate_weekly_digest};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AlertQuery {
    pub unread: bool,
}

/// `GET /api/alerts[?unread=true]`
pub async fn list_alerts_handler<S>(
    State(state): State<AppState<S>>,
    ValidQuery(query): ValidQuery<AlertQuery>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let alerts = state.storage().list_alerts(query.unread).await?;
    Ok(Json(alerts).into_response())
}

/// `POST /api/alerts/generate`
///
/// Raises reminders for appointments starting within the configured lead
/// time. Returns only the alerts created by this call.
pub async fn generate_alerts_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let created =
        generate_appointment_reminders(state.storage(), now(), state.reminder_days()).await?;
    Ok(Json(serde_json::json!({
        "created": created.len(),
        "alerts": created
    }))
    .into_response())
}

/// `POST /api/alerts/{id}/read`
pub async fn mark_read_handler<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let alert = state.storage().mark_alert_read(&id).await?;
    Ok(Json(alert).into_response())
}

/// `DELETE /api/alerts/{id}`
pub async fn delete_alert_handler<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    state.storage().delete_alert(&id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// `GET /api/alerts/digests`
pub async fn list_digests_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let digests = state.storage().list_digests().await?;
    Ok(Json(digests).into_response())
}

/// `POST /api/alerts/digests/generate`
pub async fn generate_digest_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let digest = generate_weekly_digest(state.storage(), now()).await?;
    Ok((StatusCode::CREATED, Json(digest)).into_response())
}
