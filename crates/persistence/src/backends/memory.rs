//! In-process backend.
//!
//! Records live in insertion-ordered vectors behind `parking_lot` locks.
//! Nothing survives a restart; used for tests and `CAREBRIDGE_STORAGE=memory`.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::{
    AlertStore, AppStorage, AppointmentStore, ChatStore, DigestStore, FormStore, SessionStore,
};
use crate::error::{StorageError, StorageResult};
use crate::types::{
    Appointment, AppointmentStatus, ChatMessage, FhirSession, FormTemplate, HealthAlert,
    HealthDigest, MigrationCountMap, NewAppointment, NewChatMessage, NewFhirSession,
    NewFormTemplate, NewHealthAlert, NewHealthDigest, NewPrefilledForm, PrefilledForm, new_id,
    now,
};

/// Backend keeping everything in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    sessions: RwLock<Vec<FhirSession>>,
    messages: RwLock<Vec<ChatMessage>>,
    appointments: RwLock<Vec<Appointment>>,
    templates: RwLock<Vec<FormTemplate>>,
    prefilled: RwLock<Vec<PrefilledForm>>,
    alerts: RwLock<Vec<HealthAlert>>,
    digests: RwLock<Vec<HealthDigest>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T: Clone>(items: &[T]) -> Vec<T> {
    items.iter().rev().cloned().collect()
}

#[async_trait]
impl SessionStore for MemoryBackend {
    async fn create_session(&self, session: NewFhirSession) -> StorageResult<FhirSession> {
        let created_at = now();
        let created = FhirSession::from_new(new_id(), session, created_at);

        // Demote and insert under one write lock.
        let mut sessions = self.sessions.write();
        for existing in sessions.iter_mut().filter(|s| s.is_current) {
            existing.is_current = false;
            existing.ended_at.get_or_insert(created_at);
        }
        sessions.push(created.clone());
        Ok(created)
    }

    async fn current_session(&self) -> StorageResult<Option<FhirSession>> {
        Ok(self.sessions.read().iter().find(|s| s.is_current).cloned())
    }

    async fn get_session(&self, id: &str) -> StorageResult<Option<FhirSession>> {
        Ok(self.sessions.read().iter().find(|s| s.id == id).cloned())
    }

    async fn list_sessions(&self) -> StorageResult<Vec<FhirSession>> {
        Ok(newest_first(&self.sessions.read()))
    }

    async fn end_session(&self, id: &str) -> StorageResult<FhirSession> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StorageError::not_found("session", id))?;
        session.is_current = false;
        session.ended_at.get_or_insert_with(now);
        Ok(session.clone())
    }

    async fn record_migration(
        &self,
        id: &str,
        counts: MigrationCountMap,
    ) -> StorageResult<FhirSession> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StorageError::not_found("session", id))?;
        session.migrated = true;
        session.migrated_at = Some(now());
        session.migration_counts = counts;
        Ok(session.clone())
    }
}

#[async_trait]
impl ChatStore for MemoryBackend {
    async fn add_message(&self, message: NewChatMessage) -> StorageResult<ChatMessage> {
        let stored = ChatMessage {
            id: new_id(),
            session_id: message.session_id,
            role: message.role,
            content: message.content,
            created_at: now(),
        };
        self.messages.write().push(stored.clone());
        Ok(stored)
    }

    async fn list_messages(&self, session_id: Option<&str>) -> StorageResult<Vec<ChatMessage>> {
        Ok(self
            .messages
            .read()
            .iter()
            .filter(|m| session_id.is_none() || m.session_id.as_deref() == session_id)
            .cloned()
            .collect())
    }

    async fn clear_messages(&self) -> StorageResult<usize> {
        let mut messages = self.messages.write();
        let count = messages.len();
        messages.clear();
        Ok(count)
    }
}

#[async_trait]
impl AppointmentStore for MemoryBackend {
    async fn create_appointment(&self, appointment: NewAppointment) -> StorageResult<Appointment> {
        let stored = Appointment {
            id: new_id(),
            title: appointment.title,
            provider_name: appointment.provider_name,
            location: appointment.location,
            starts_at: appointment.starts_at,
            ends_at: appointment.ends_at,
            status: AppointmentStatus::Scheduled,
            notes: appointment.notes,
            created_at: now(),
        };
        self.appointments.write().push(stored.clone());
        Ok(stored)
    }

    async fn get_appointment(&self, id: &str) -> StorageResult<Option<Appointment>> {
        Ok(self.appointments.read().iter().find(|a| a.id == id).cloned())
    }

    async fn list_appointments(&self) -> StorageResult<Vec<Appointment>> {
        let mut appointments = self.appointments.read().clone();
        appointments.sort_by_key(|a| a.starts_at);
        Ok(appointments)
    }

    async fn update_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> StorageResult<Appointment> {
        let mut appointments = self.appointments.write();
        let appointment = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StorageError::not_found("appointment", id))?;
        appointment.status = status;
        Ok(appointment.clone())
    }

    async fn delete_appointment(&self, id: &str) -> StorageResult<()> {
        let mut appointments = self.appointments.write();
        let before = appointments.len();
        appointments.retain(|a| a.id != id);
        if appointments.len() == before {
            return Err(StorageError::not_found("appointment", id));
        }
        Ok(())
    }
}

#[async_trait]
impl FormStore for MemoryBackend {
    async fn create_template(&self, template: NewFormTemplate) -> StorageResult<FormTemplate> {
        let stored = FormTemplate {
            id: new_id(),
            name: template.name,
            description: template.description,
            fields: template.fields,
            created_at: now(),
        };
        self.templates.write().push(stored.clone());
        Ok(stored)
    }

    async fn get_template(&self, id: &str) -> StorageResult<Option<FormTemplate>> {
        Ok(self.templates.read().iter().find(|t| t.id == id).cloned())
    }

    async fn list_templates(&self) -> StorageResult<Vec<FormTemplate>> {
        Ok(self.templates.read().clone())
    }

    async fn save_prefilled(&self, form: NewPrefilledForm) -> StorageResult<PrefilledForm> {
        if !self.templates.read().iter().any(|t| t.id == form.template_id) {
            return Err(StorageError::not_found("form template", form.template_id));
        }
        let stored = PrefilledForm {
            id: new_id(),
            template_id: form.template_id,
            appointment_id: form.appointment_id,
            values: form.values,
            missing_fields: form.missing_fields,
            created_at: now(),
        };
        self.prefilled.write().push(stored.clone());
        Ok(stored)
    }

    async fn list_prefilled(&self) -> StorageResult<Vec<PrefilledForm>> {
        Ok(newest_first(&self.prefilled.read()))
    }
}

#[async_trait]
impl AlertStore for MemoryBackend {
    async fn create_alert(&self, alert: NewHealthAlert) -> StorageResult<HealthAlert> {
        let stored = HealthAlert {
            id: new_id(),
            kind: alert.kind,
            severity: alert.severity,
            title: alert.title,
            message: alert.message,
            dedup_key: alert.dedup_key,
            read: false,
            created_at: now(),
        };
        self.alerts.write().push(stored.clone());
        Ok(stored)
    }

    async fn list_alerts(&self, unread_only: bool) -> StorageResult<Vec<HealthAlert>> {
        Ok(self
            .alerts
            .read()
            .iter()
            .rev()
            .filter(|a| !unread_only || !a.read)
            .cloned()
            .collect())
    }

    async fn mark_alert_read(&self, id: &str) -> StorageResult<HealthAlert> {
        let mut alerts = self.alerts.write();
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StorageError::not_found("alert", id))?;
        alert.read = true;
        Ok(alert.clone())
    }

    async fn delete_alert(&self, id: &str) -> StorageResult<()> {
        let mut alerts = self.alerts.write();
        let before = alerts.len();
        alerts.retain(|a| a.id != id);
        if alerts.len() == before {
            return Err(StorageError::not_found("alert", id));
        }
        Ok(())
    }

    async fn alert_exists(&self, dedup_key: &str) -> StorageResult<bool> {
        Ok(self
            .alerts
            .read()
            .iter()
            .any(|a| a.dedup_key.as_deref() == Some(dedup_key)))
    }
}

#[async_trait]
impl DigestStore for MemoryBackend {
    async fn create_digest(&self, digest: NewHealthDigest) -> StorageResult<HealthDigest> {
        let stored = HealthDigest {
            id: new_id(),
            period_start: digest.period_start,
            period_end: digest.period_end,
            summary: digest.summary,
            highlights: digest.highlights,
            created_at: now(),
        };
        self.digests.write().push(stored.clone());
        Ok(stored)
    }

    async fn list_digests(&self) -> StorageResult<Vec<HealthDigest>> {
        Ok(newest_first(&self.digests.read()))
    }

    async fn latest_digest(&self) -> StorageResult<Option<HealthDigest>> {
        Ok(self.digests.read().last().cloned())
    }
}

impl AppStorage for MemoryBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
