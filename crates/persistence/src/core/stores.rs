//! Store trait definitions.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::{
    Appointment, AppointmentStatus, ChatMessage, FhirSession, FormTemplate, HealthAlert,
    HealthDigest, MigrationCountMap, NewAppointment, NewChatMessage, NewFhirSession,
    NewFormTemplate, NewHealthAlert, NewHealthDigest, NewPrefilledForm, PrefilledForm,
};

/// Provider sessions.
///
/// The "current" session is the one API calls act on. Exactly the session
/// flagged current is returned by [`current_session`](Self::current_session);
/// when none is flagged there is no current session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores a new session and makes it current.
    ///
    /// Every previously current session is demoted and stamped `ended_at`
    /// in the same atomic step, so at most one session is ever current.
    async fn create_session(&self, session: NewFhirSession) -> StorageResult<FhirSession>;

    async fn current_session(&self) -> StorageResult<Option<FhirSession>>;

    async fn get_session(&self, id: &str) -> StorageResult<Option<FhirSession>>;

    /// All sessions, newest first.
    async fn list_sessions(&self) -> StorageResult<Vec<FhirSession>>;

    /// Clears the current flag and stamps `ended_at` unless already set.
    ///
    /// The session row is kept.
    async fn end_session(&self, id: &str) -> StorageResult<FhirSession>;

    /// Marks a session migrated with the given per-type counts.
    async fn record_migration(
        &self,
        id: &str,
        counts: MigrationCountMap,
    ) -> StorageResult<FhirSession>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn add_message(&self, message: NewChatMessage) -> StorageResult<ChatMessage>;

    /// Messages oldest first; filtered to one session when `session_id` is
    /// given.
    async fn list_messages(&self, session_id: Option<&str>) -> StorageResult<Vec<ChatMessage>>;

    /// Deletes every message and returns how many there were.
    async fn clear_messages(&self) -> StorageResult<usize>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create_appointment(&self, appointment: NewAppointment) -> StorageResult<Appointment>;

    async fn get_appointment(&self, id: &str) -> StorageResult<Option<Appointment>>;

    /// All appointments ordered by start time.
    async fn list_appointments(&self) -> StorageResult<Vec<Appointment>>;

    async fn update_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> StorageResult<Appointment>;

    async fn delete_appointment(&self, id: &str) -> StorageResult<()>;
}

#[async_trait]
pub trait FormStore: Send + Sync {
    async fn create_template(&self, template: NewFormTemplate) -> StorageResult<FormTemplate>;

    async fn get_template(&self, id: &str) -> StorageResult<Option<FormTemplate>>;

    /// Templates in creation order.
    async fn list_templates(&self) -> StorageResult<Vec<FormTemplate>>;

    /// Stores a prefilled form. The template must exist.
    async fn save_prefilled(&self, form: NewPrefilledForm) -> StorageResult<PrefilledForm>;

    /// Prefilled forms, newest first.
    async fn list_prefilled(&self) -> StorageResult<Vec<PrefilledForm>>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn create_alert(&self, alert: NewHealthAlert) -> StorageResult<HealthAlert>;

    /// Alerts newest first, optionally only unread ones.
    async fn list_alerts(&self, unread_only: bool) -> StorageResult<Vec<HealthAlert>>;

    async fn mark_alert_read(&self, id: &str) -> StorageResult<HealthAlert>;

    async fn delete_alert(&self, id: &str) -> StorageResult<()>;

    /// Whether any alert carries `dedup_key`.
    async fn alert_exists(&self, dedup_key: &str) -> StorageResult<bool>;
}

#[async_trait]
pub trait DigestStore: Send + Sync {
    async fn create_digest(&self, digest: NewHealthDigest) -> StorageResult<HealthDigest>;

    /// Digests newest first.
    async fn list_digests(&self) -> StorageResult<Vec<HealthDigest>>;

    async fn latest_digest(&self) -> StorageResult<Option<HealthDigest>>;
}

/// Everything the application stores.
pub trait AppStorage:
    SessionStore + ChatStore + AppointmentStore + FormStore + AlertStore + DigestStore + 'static
{
    /// Short backend name for health reporting, e.g. `sqlite`.
    fn backend_name(&self) -> &'static str;
}
