//! Appointment and form handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;

use carebridge_persistence::AppStorage;
use carebridge_persistence::types::{
    AppointmentStatus, NewAppointment, NewFormTemplate, NewPrefilledForm,
};

use crate::error::{FieldIssue, RestError, RestResult};
use crate::extractors::{CurrentSession, ValidJson};
use crate::handlers::fhir::session_bundle;
use crate::services::prefill_template;
use crate::state::AppState;

fn validate_appointment(appointment: &NewAppointment) -> RestResult<()> {
    let mut issues = Vec::new();
    if appointment.title.trim().is_empty() {
        issues.push(FieldIssue::new("title", "title is required"));
    }
    if appointment
        .ends_at
        .is_some_and(|ends_at| ends_at <= appointment.starts_at)
    {
        issues.push(FieldIssue::new("endsAt", "must be after startsAt"));
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(RestError::Validation { issues })
    }
}

fn validate_template(template: &NewFormTemplate) -> RestResult<()> {
    let mut issues = Vec::new();
    if template.name.trim().is_empty() {
        issues.push(FieldIssue::new("name", "name is required"));
    }
    if template.fields.is_empty() {
        issues.push(FieldIssue::new("fields", "at least one field is required"));
    }
    for (index, field) in template.fields.iter().enumerate() {
        if field.key.trim().is_empty() {
            issues.push(FieldIssue::new(format!("fields[{}].key", index), "key is required"));
        } else if template.fields[..index].iter().any(|f| f.key == field.key) {
            issues.push(FieldIssue::new(
                format!("fields[{}].key", index),
                format!("duplicate key '{}'", field.key),
            ));
        }
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(RestError::Validation { issues })
    }
}

// ============================================================================
// Appointments
// ============================================================================

/// `GET /api/scheduling/appointments`
pub async fn list_appointments_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let appointments = state.storage().list_appointments().await?;
    Ok(Json(appointments).into_response())
}

/// `POST /api/scheduling/appointments`
pub async fn create_appointment_handler<S>(
    State(state): State<AppState<S>>,
    ValidJson(appointment): ValidJson<NewAppointment>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    validate_appointment(&appointment)?;
    let created = state.storage().create_appointment(appointment).await?;
    info!(appointment_id = %created.id, starts_at = %created.starts_at, "Appointment created");
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// `GET /api/scheduling/appointments/{id}`
pub async fn get_appointment_handler<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let appointment = state
        .storage()
        .get_appointment(&id)
        .await?
        .ok_or_else(|| RestError::not_found("appointment", &id))?;
    Ok(Json(appointment).into_response())
}

/// `DELETE /api/scheduling/appointments/{id}`
pub async fn delete_appointment_handler<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    state.storage().delete_appointment(&id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Body of `PATCH /api/scheduling/appointments/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: AppointmentStatus,
}

/// `PATCH /api/scheduling/appointments/{id}/status`
pub async fn update_status_handler<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    ValidJson(update): ValidJson<StatusUpdate>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let updated = state
        .storage()
        .update_appointment_status(&id, update.status)
        .await?;
    info!(appointment_id = %updated.id, status = %updated.status, "Appointment status changed");
    Ok(Json(updated).into_response())
}

// ============================================================================
// Forms
// ============================================================================

/// `GET /api/scheduling/forms/templates`
pub async fn list_templates_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let templates = state.storage().list_templates().await?;
    Ok(Json(templates).into_response())
}

/// `POST /api/scheduling/forms/templates`
pub async fn create_template_handler<S>(
    State(state): State<AppState<S>>,
    ValidJson(template): ValidJson<NewFormTemplate>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    validate_template(&template)?;
    let created = state.storage().create_template(template).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// `GET /api/scheduling/forms`
pub async fn list_prefilled_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let forms = state.storage().list_prefilled().await?;
    Ok(Json(forms).into_response())
}

/// Body of `POST /api/scheduling/forms/prefill`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefillRequest {
    pub template_id: String,
    pub appointment_id: Option<String>,
}

/// `POST /api/scheduling/forms/prefill`
///
/// Fills the template from the connected patient's record and stores the
/// result. Fields the record cannot answer are listed in `missingFields`.
pub async fn prefill_handler<S>(
    State(state): State<AppState<S>>,
    CurrentSession(session): CurrentSession,
    ValidJson(request): ValidJson<PrefillRequest>,
) -> RestResult<Response>
where
    S: AppStorage + 'static,
{
    let template = state
        .storage()
        .get_template(&request.template_id)
        .await?
        .ok_or_else(|| RestError::not_found("form template", &request.template_id))?;

    if let Some(appointment_id) = &request.appointment_id {
        if state.storage().get_appointment(appointment_id).await?.is_none() {
            return Err(RestError::not_found("appointment", appointment_id));
        }
    }

    let bundle = session_bundle(&state, &session).await?;
    let result = prefill_template(&template, &bundle);

    let form = state
        .storage()
        .save_prefilled(NewPrefilledForm {
            template_id: template.id,
            appointment_id: request.appointment_id,
            values: result.values,
            missing_fields: result.missing_fields,
        })
        .await?;

    info!(
        form_id = %form.id,
        filled = form.values.len(),
        missing = form.missing_fields.len(),
        "Form prefilled"
    );
    Ok((StatusCode::CREATED, Json(form)).into_response())
}
