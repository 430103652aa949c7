//! API route configuration.

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use carebridge_persistence::AppStorage;

use crate::handlers::{ai, alerts, chat, external, fhir, health, scheduling, sessions};
use crate::state::AppState;

/// Creates all API routes.
///
/// # Routes
///
/// ## Sessions and provider data
/// - `GET|POST /api/fhir/sessions` - List / connect
/// - `GET|DELETE /api/fhir/sessions/current` - Current session / disconnect
/// - `DELETE /api/fhir/sessions/{id}` - End a session
/// - `POST /api/fhir/sessions/current/migrate` - Copy the record locally
/// - `GET /api/fhir/bundle` - The connected patient's record
/// - `GET /api/fhir/{type}` - Proxied search
/// - `GET /api/fhir/{type}/{id}` - Proxied read
///
/// ## Assistant
/// - `GET|POST|DELETE /api/chat/messages` - History / ask / clear
/// - `POST /api/ai/narrative` - Record summary
///
/// ## Lookups
/// - `GET /api/external/clinical-trials[/{nct_id}]`
/// - `GET /api/external/drugs/search`, `POST /api/external/drugs/interactions`
/// - `GET /api/external/providers/search`, `GET /api/external/providers/{npi}`
///
/// ## Scheduling
/// - `GET|POST /api/scheduling/appointments`
/// - `GET|DELETE /api/scheduling/appointments/{id}`
/// - `PATCH /api/scheduling/appointments/{id}/status`
/// - `GET|POST /api/scheduling/forms/templates`
/// - `GET /api/scheduling/forms`, `POST /api/scheduling/forms/prefill`
///
/// ## Alerts
/// - `GET /api/alerts`, `POST /api/alerts/generate`
/// - `POST /api/alerts/{id}/read`, `DELETE /api/alerts/{id}`
/// - `GET /api/alerts/digests`, `POST /api/alerts/digests/generate`
pub fn create_routes<S>(state: AppState<S>) -> Router
where
    S: AppStorage + 'static,
{
    Router::new()
        .route("/health", get(health::health_handler::<S>))
        // Sessions
        .route(
            "/api/fhir/sessions",
            get(sessions::list_sessions_handler::<S>).post(sessions::connect_handler::<S>),
        )
        .route(
            "/api/fhir/sessions/current",
            get(sessions::current_session_handler)
                .delete(sessions::end_current_session_handler::<S>),
        )
        .route(
            "/api/fhir/sessions/current/migrate",
            post(sessions::migrate_handler::<S>),
        )
        .route(
            "/api/fhir/sessions/{id}",
            delete(sessions::end_session_handler::<S>),
        )
        // Provider data
        .route("/api/fhir/bundle", get(fhir::bundle_handler::<S>))
        .route("/api/fhir/{resource_type}", get(fhir::search_handler::<S>))
        .route(
            "/api/fhir/{resource_type}/{id}",
            get(fhir::read_handler::<S>),
        )
        // Assistant
        .route(
            "/api/chat/messages",
            get(chat::list_messages_handler::<S>)
                .post(chat::ask_handler::<S>)
                .delete(chat::clear_messages_handler::<S>),
        )
        .route("/api/ai/narrative", post(ai::narrative_handler::<S>))
        // Lookups
        .route(
            "/api/external/clinical-trials",
            get(external::search_trials_handler::<S>),
        )
        .route(
            "/api/external/clinical-trials/{nct_id}",
            get(external::get_trial_handler::<S>),
        )
        .route(
            "/api/external/drugs/search",
            get(external::search_drugs_handler::<S>),
        )
        .route(
            "/api/external/drugs/interactions",
            post(external::drug_interactions_handler::<S>),
        )
        .route(
            "/api/external/providers/search",
            get(external::search_providers_handler::<S>),
        )
        .route(
            "/api/external/providers/{npi}",
            get(external::get_provider_handler::<S>),
        )
        // Scheduling
        .route(
            "/api/scheduling/appointments",
            get(scheduling::list_appointments_handler::<S>)
                .post(scheduling::create_appointment_handler::<S>),
        )
        .route(
            "/api/scheduling/appointments/{id}",
            get(scheduling::get_appointment_handler::<S>)
                .delete(scheduling::delete_appointment_handler::<S>),
        )
        .route(
            "/api/scheduling/appointments/{id}/status",
            patch(scheduling::update_status_handler::<S>),
        )
        .route(
            "/api/scheduling/forms/templates",
            get(scheduling::list_templates_handler::<S>)
                .post(scheduling::create_template_handler::<S>),
        )
        .route(
            "/api/scheduling/forms",
            get(scheduling::list_prefilled_handler::<S>),
        )
        .route(
            "/api/scheduling/forms/prefill",
            post(scheduling::prefill_handler::<S>),
        )
        // Alerts
        .route("/api/alerts", get(alerts::list_alerts_handler::<S>))
        .route(
            "/api/alerts/generate",
            post(alerts::generate_alerts_handler::<S>),
        )
        .route(
            "/api/alerts/digests",
            get(alerts::list_digests_handler::<S>),
        )
        .route(
            "/api/alerts/digests/generate",
            post(alerts::generate_digest_handler::<S>),
        )
        .route("/api/alerts/{id}/read", post(alerts::mark_read_handler::<S>))
        .route("/api/alerts/{id}", delete(alerts::delete_alert_handler::<S>))
        // State
        .with_state(state)
}
