//! Store trait implementations for the SQLite backend.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use serde::de::DeserializeOwned;

use crate::core::{
    AlertStore, AppStorage, AppointmentStore, ChatStore, DigestStore, FormStore, SessionStore,
};
use crate::error::{BackendError, StorageError, StorageResult};
use crate::types::{
    Appointment, AppointmentStatus, ChatMessage, FhirSession, FormTemplate, HealthAlert,
    HealthDigest, MigrationCountMap, NewAppointment, NewChatMessage, NewFhirSession,
    NewFormTemplate, NewHealthAlert, NewHealthDigest, NewPrefilledForm, PrefilledForm, new_id,
    now,
};

use super::SqliteBackend;

fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message,
        source: None,
    })
}

fn serialization_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::SerializationError { message })
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> StorageResult<String> {
    serde_json::to_string(value)
        .map_err(|e| serialization_error(format!("Failed to serialize {}: {}", what, e)))
}

/// Timestamps are stored as fixed-width RFC 3339 text so they sort lexically.
fn timestamp_text(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_failure(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_failure(idx, e))
}

fn optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|text| {
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_failure(idx, e))
    })
    .transpose()
}

fn text_value<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_failure(idx, e))
}

fn json_value<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_failure(idx, e))
}

// ============================================================================
// Row mapping
// ============================================================================

const SESSION_COLUMNS: &str = "id, provider, access_token, refresh_token, token_expires_at,
    fhir_server_url, patient_id, scope, is_current, migrated, migrated_at, migration_counts,
    created_at, ended_at";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<FhirSession> {
    Ok(FhirSession {
        id: row.get(0)?,
        provider: row.get(1)?,
        access_token: row.get(2)?,
        refresh_token: row.get(3)?,
        token_expires_at: optional_timestamp(row, 4)?,
        fhir_server_url: row.get(5)?,
        patient_id: row.get(6)?,
        scope: row.get(7)?,
        is_current: row.get(8)?,
        migrated: row.get(9)?,
        migrated_at: optional_timestamp(row, 10)?,
        migration_counts: json_value(row, 11)?,
        created_at: timestamp(row, 12)?,
        ended_at: optional_timestamp(row, 13)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, session_id, role, content, created_at";

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role: text_value(row, 2)?,
        content: row.get(3)?,
        created_at: timestamp(row, 4)?,
    })
}

const APPOINTMENT_COLUMNS: &str =
    "id, title, provider_name, location, starts_at, ends_at, status, notes, created_at";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        title: row.get(1)?,
        provider_name: row.get(2)?,
        location: row.get(3)?,
        starts_at: timestamp(row, 4)?,
        ends_at: optional_timestamp(row, 5)?,
        status: text_value(row, 6)?,
        notes: row.get(7)?,
        created_at: timestamp(row, 8)?,
    })
}

const TEMPLATE_COLUMNS: &str = "id, name, description, fields, created_at";

fn template_from_row(row: &Row<'_>) -> rusqlite::Result<FormTemplate> {
    Ok(FormTemplate {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        fields: json_value(row, 3)?,
        created_at: timestamp(row, 4)?,
    })
}

const PREFILLED_COLUMNS: &str =
    "id, template_id, appointment_id, field_values, missing_fields, created_at";

fn prefilled_from_row(row: &Row<'_>) -> rusqlite::Result<PrefilledForm> {
    Ok(PrefilledForm {
        id: row.get(0)?,
        template_id: row.get(1)?,
        appointment_id: row.get(2)?,
        values: json_value(row, 3)?,
        missing_fields: json_value(row, 4)?,
        created_at: timestamp(row, 5)?,
    })
}

const ALERT_COLUMNS: &str = "id, kind, severity, title, message, dedup_key, is_read, created_at";

fn alert_from_row(row: &Row<'_>) -> rusqlite::Result<HealthAlert> {
    Ok(HealthAlert {
        id: row.get(0)?,
        kind: text_value(row, 1)?,
        severity: text_value(row, 2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        dedup_key: row.get(5)?,
        read: row.get(6)?,
        created_at: timestamp(row, 7)?,
    })
}

const DIGEST_COLUMNS: &str = "id, period_start, period_end, summary, highlights, created_at";

fn digest_from_row(row: &Row<'_>) -> rusqlite::Result<HealthDigest> {
    Ok(HealthDigest {
        id: row.get(0)?,
        period_start: timestamp(row, 1)?,
        period_end: timestamp(row, 2)?,
        summary: row.get(3)?,
        highlights: json_value(row, 4)?,
        created_at: timestamp(row, 5)?,
    })
}

/// Reads a single row by id.
fn fetch_one<T>(
    conn: &Connection,
    table: &str,
    columns: &str,
    id: &str,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StorageResult<Option<T>> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", columns, table);
    conn.query_row(&sql, params![id], map)
        .optional()
        .map_err(|e| internal_error(format!("Failed to read from {}: {}", table, e)))
}

/// Like [`fetch_one`] for a row this operation just wrote.
fn fetch_written<T>(
    conn: &Connection,
    table: &str,
    columns: &str,
    id: &str,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StorageResult<T> {
    fetch_one(conn, table, columns, id, map)?
        .ok_or_else(|| internal_error(format!("Row {} vanished from {} after write", id, table)))
}

fn fetch_all<T, P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StorageResult<Vec<T>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| internal_error(format!("Failed to prepare query: {}", e)))?;
    let rows = stmt
        .query_map(params, map)
        .map_err(|e| internal_error(format!("Failed to run query: {}", e)))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| internal_error(format!("Failed to read row: {}", e)))
}

// ============================================================================
// Sessions
// ============================================================================

#[async_trait]
impl SessionStore for SqliteBackend {
    async fn create_session(&self, session: NewFhirSession) -> StorageResult<FhirSession> {
        let mut conn = self.get_connection()?;
        let id = new_id();
        let created_at = timestamp_text(&now());

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| internal_error(format!("Failed to begin transaction: {}", e)))?;

        let demoted = tx
            .execute(
                "UPDATE fhir_sessions
                 SET is_current = 0, ended_at = COALESCE(ended_at, ?1)
                 WHERE is_current = 1",
                params![created_at],
            )
            .map_err(|e| internal_error(format!("Failed to demote sessions: {}", e)))?;

        tx.execute(
            "INSERT INTO fhir_sessions
                (id, provider, access_token, refresh_token, token_expires_at, fhir_server_url,
                 patient_id, scope, is_current, migrated, migration_counts, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, 0, '{}', ?9)",
            params![
                id,
                session.provider,
                session.access_token,
                session.refresh_token,
                session.token_expires_at.as_ref().map(timestamp_text),
                session.fhir_server_url,
                session.patient_id,
                session.scope,
                created_at,
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert session: {}", e)))?;

        let created = fetch_written(&tx, "fhir_sessions", SESSION_COLUMNS, &id, session_from_row)?;

        tx.commit()
            .map_err(|e| internal_error(format!("Failed to commit session: {}", e)))?;

        tracing::debug!(session_id = %id, demoted, "Created current session");
        Ok(created)
    }

    async fn current_session(&self) -> StorageResult<Option<FhirSession>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {} FROM fhir_sessions WHERE is_current = 1",
            SESSION_COLUMNS
        );
        conn.query_row(&sql, [], session_from_row)
            .optional()
            .map_err(|e| internal_error(format!("Failed to read current session: {}", e)))
    }

    async fn get_session(&self, id: &str) -> StorageResult<Option<FhirSession>> {
        let conn = self.get_connection()?;
        fetch_one(&conn, "fhir_sessions", SESSION_COLUMNS, id, session_from_row)
    }

    async fn list_sessions(&self) -> StorageResult<Vec<FhirSession>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {} FROM fhir_sessions ORDER BY created_at DESC, rowid DESC",
            SESSION_COLUMNS
        );
        fetch_all(&conn, &sql, [], session_from_row)
    }

    async fn end_session(&self, id: &str) -> StorageResult<FhirSession> {
        let conn = self.get_connection()?;
        let updated = conn
            .execute(
                "UPDATE fhir_sessions
                 SET is_current = 0, ended_at = COALESCE(ended_at, ?2)
                 WHERE id = ?1",
                params![id, timestamp_text(&now())],
            )
            .map_err(|e| internal_error(format!("Failed to end session: {}", e)))?;
        if updated == 0 {
            return Err(StorageError::not_found("session", id));
        }
        fetch_written(&conn, "fhir_sessions", SESSION_COLUMNS, id, session_from_row)
    }

    async fn record_migration(
        &self,
        id: &str,
        counts: MigrationCountMap,
    ) -> StorageResult<FhirSession> {
        let conn = self.get_connection()?;
        let updated = conn
            .execute(
                "UPDATE fhir_sessions
                 SET migrated = 1, migrated_at = ?2, migration_counts = ?3
                 WHERE id = ?1",
                params![
                    id,
                    timestamp_text(&now()),
                    to_json(&counts, "migration counts")?
                ],
            )
            .map_err(|e| internal_error(format!("Failed to record migration: {}", e)))?;
        if updated == 0 {
            return Err(StorageError::not_found("session", id));
        }
        fetch_written(&conn, "fhir_sessions", SESSION_COLUMNS, id, session_from_row)
    }
}

// ============================================================================
// Chat
// ============================================================================

#[async_trait]
impl ChatStore for SqliteBackend {
    async fn add_message(&self, message: NewChatMessage) -> StorageResult<ChatMessage> {
        let conn = self.get_connection()?;
        let id = new_id();
        conn.execute(
            "INSERT INTO chat_messages (id, session_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                message.session_id,
                message.role.as_str(),
                message.content,
                timestamp_text(&now()),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert chat message: {}", e)))?;
        fetch_written(&conn, "chat_messages", MESSAGE_COLUMNS, &id, message_from_row)
    }

    async fn list_messages(&self, session_id: Option<&str>) -> StorageResult<Vec<ChatMessage>> {
        let conn = self.get_connection()?;
        match session_id {
            Some(session_id) => {
                let sql = format!(
                    "SELECT {} FROM chat_messages WHERE session_id = ?1
                     ORDER BY created_at, rowid",
                    MESSAGE_COLUMNS
                );
                fetch_all(&conn, &sql, params![session_id], message_from_row)
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM chat_messages ORDER BY created_at, rowid",
                    MESSAGE_COLUMNS
                );
                fetch_all(&conn, &sql, [], message_from_row)
            }
        }
    }

    async fn clear_messages(&self) -> StorageResult<usize> {
        let conn = self.get_connection()?;
        conn.execute("DELETE FROM chat_messages", [])
            .map_err(|e| internal_error(format!("Failed to clear chat messages: {}", e)))
    }
}

// ============================================================================
// Appointments
// ============================================================================

#[async_trait]
impl AppointmentStore for SqliteBackend {
    async fn create_appointment(&self, appointment: NewAppointment) -> StorageResult<Appointment> {
        let conn = self.get_connection()?;
        let id = new_id();
        conn.execute(
            "INSERT INTO appointments
                (id, title, provider_name, location, starts_at, ends_at, status, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                appointment.title,
                appointment.provider_name,
                appointment.location,
                timestamp_text(&appointment.starts_at),
                appointment.ends_at.as_ref().map(timestamp_text),
                AppointmentStatus::Scheduled.as_str(),
                appointment.notes,
                timestamp_text(&now()),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert appointment: {}", e)))?;
        fetch_written(&conn, "appointments", APPOINTMENT_COLUMNS, &id, appointment_from_row)
    }

    async fn get_appointment(&self, id: &str) -> StorageResult<Option<Appointment>> {
        let conn = self.get_connection()?;
        fetch_one(&conn, "appointments", APPOINTMENT_COLUMNS, id, appointment_from_row)
    }

    async fn list_appointments(&self) -> StorageResult<Vec<Appointment>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {} FROM appointments ORDER BY starts_at, rowid",
            APPOINTMENT_COLUMNS
        );
        fetch_all(&conn, &sql, [], appointment_from_row)
    }

    async fn update_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> StorageResult<Appointment> {
        let conn = self.get_connection()?;
        let updated = conn
            .execute(
                "UPDATE appointments SET status = ?2 WHERE id = ?1",
                params![id, status.as_str()],
            )
            .map_err(|e| internal_error(format!("Failed to update appointment: {}", e)))?;
        if updated == 0 {
            return Err(StorageError::not_found("appointment", id));
        }
        fetch_written(&conn, "appointments", APPOINTMENT_COLUMNS, id, appointment_from_row)
    }

    async fn delete_appointment(&self, id: &str) -> StorageResult<()> {
        let conn = self.get_connection()?;
        let deleted = conn
            .execute("DELETE FROM appointments WHERE id = ?1", params![id])
            .map_err(|e| internal_error(format!("Failed to delete appointment: {}", e)))?;
        if deleted == 0 {
            return Err(StorageError::not_found("appointment", id));
        }
        Ok(())
    }
}

// ============================================================================
// Forms
// ============================================================================

#[async_trait]
impl FormStore for SqliteBackend {
    async fn create_template(&self, template: NewFormTemplate) -> StorageResult<FormTemplate> {
        let conn = self.get_connection()?;
        let id = new_id();
        conn.execute(
            "INSERT INTO form_templates (id, name, description, fields, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                template.name,
                template.description,
                to_json(&template.fields, "form fields")?,
                timestamp_text(&now()),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert form template: {}", e)))?;
        fetch_written(&conn, "form_templates", TEMPLATE_COLUMNS, &id, template_from_row)
    }

    async fn get_template(&self, id: &str) -> StorageResult<Option<FormTemplate>> {
        let conn = self.get_connection()?;
        fetch_one(&conn, "form_templates", TEMPLATE_COLUMNS, id, template_from_row)
    }

    async fn list_templates(&self) -> StorageResult<Vec<FormTemplate>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {} FROM form_templates ORDER BY created_at, rowid",
            TEMPLATE_COLUMNS
        );
        fetch_all(&conn, &sql, [], template_from_row)
    }

    async fn save_prefilled(&self, form: NewPrefilledForm) -> StorageResult<PrefilledForm> {
        let conn = self.get_connection()?;
        if fetch_one(
            &conn,
            "form_templates",
            TEMPLATE_COLUMNS,
            &form.template_id,
            template_from_row,
        )?
        .is_none()
        {
            return Err(StorageError::not_found("form template", form.template_id));
        }

        let id = new_id();
        conn.execute(
            "INSERT INTO prefilled_forms
                (id, template_id, appointment_id, field_values, missing_fields, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                form.template_id,
                form.appointment_id,
                to_json(&form.values, "form values")?,
                to_json(&form.missing_fields, "missing fields")?,
                timestamp_text(&now()),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert prefilled form: {}", e)))?;
        fetch_written(&conn, "prefilled_forms", PREFILLED_COLUMNS, &id, prefilled_from_row)
    }

    async fn list_prefilled(&self) -> StorageResult<Vec<PrefilledForm>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {} FROM prefilled_forms ORDER BY created_at DESC, rowid DESC",
            PREFILLED_COLUMNS
        );
        fetch_all(&conn, &sql, [], prefilled_from_row)
    }
}

// ============================================================================
// Alerts
// ============================================================================

#[async_trait]
impl AlertStore for SqliteBackend {
    async fn create_alert(&self, alert: NewHealthAlert) -> StorageResult<HealthAlert> {
        let conn = self.get_connection()?;
        let id = new_id();
        conn.execute(
            "INSERT INTO health_alerts
                (id, kind, severity, title, message, dedup_key, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
            params![
                id,
                alert.kind.as_str(),
                alert.severity.as_str(),
                alert.title,
                alert.message,
                alert.dedup_key,
                timestamp_text(&now()),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert alert: {}", e)))?;
        fetch_written(&conn, "health_alerts", ALERT_COLUMNS, &id, alert_from_row)
    }

    async fn list_alerts(&self, unread_only: bool) -> StorageResult<Vec<HealthAlert>> {
        let conn = self.get_connection()?;
        let filter = if unread_only { "WHERE is_read = 0" } else { "" };
        let sql = format!(
            "SELECT {} FROM health_alerts {} ORDER BY created_at DESC, rowid DESC",
            ALERT_COLUMNS, filter
        );
        fetch_all(&conn, &sql, [], alert_from_row)
    }

    async fn mark_alert_read(&self, id: &str) -> StorageResult<HealthAlert> {
        let conn = self.get_connection()?;
        let updated = conn
            .execute(
                "UPDATE health_alerts SET is_read = 1 WHERE id = ?1",
                params![id],
            )
            .map_err(|e| internal_error(format!("Failed to update alert: {}", e)))?;
        if updated == 0 {
            return Err(StorageError::not_found("alert", id));
        }
        fetch_written(&conn, "health_alerts", ALERT_COLUMNS, id, alert_from_row)
    }

    async fn delete_alert(&self, id: &str) -> StorageResult<()> {
        let conn = self.get_connection()?;
        let deleted = conn
            .execute("DELETE FROM health_alerts WHERE id = ?1", params![id])
            .map_err(|e| internal_error(format!("Failed to delete alert: {}", e)))?;
        if deleted == 0 {
            return Err(StorageError::not_found("alert", id));
        }
        Ok(())
    }

    async fn alert_exists(&self, dedup_key: &str) -> StorageResult<bool> {
        let conn = self.get_connection()?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM health_alerts WHERE dedup_key = ?1)",
            params![dedup_key],
            |row| row.get(0),
        )
        .map_err(|e| internal_error(format!("Failed to check alert: {}", e)))
    }
}

// ============================================================================
// Digests
// ============================================================================

#[async_trait]
impl DigestStore for SqliteBackend {
    async fn create_digest(&self, digest: NewHealthDigest) -> StorageResult<HealthDigest> {
        let conn = self.get_connection()?;
        let id = new_id();
        conn.execute(
            "INSERT INTO health_digests
                (id, period_start, period_end, summary, highlights, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                timestamp_text(&digest.period_start),
                timestamp_text(&digest.period_end),
                digest.summary,
                to_json(&digest.highlights, "digest highlights")?,
                timestamp_text(&now()),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert digest: {}", e)))?;
        fetch_written(&conn, "health_digests", DIGEST_COLUMNS, &id, digest_from_row)
    }

    async fn list_digests(&self) -> StorageResult<Vec<HealthDigest>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {} FROM health_digests ORDER BY created_at DESC, rowid DESC",
            DIGEST_COLUMNS
        );
        fetch_all(&conn, &sql, [], digest_from_row)
    }

    async fn latest_digest(&self) -> StorageResult<Option<HealthDigest>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {} FROM health_digests ORDER BY created_at DESC, rowid DESC LIMIT 1",
            DIGEST_COLUMNS
        );
        conn.query_row(&sql, [], digest_from_row)
            .optional()
            .map_err(|e| internal_error(format!("Failed to read latest digest: {}", e)))
    }
}

impl AppStorage for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn backend() -> SqliteBackend {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.init_schema().unwrap();
        backend
    }

    #[test]
    fn test_timestamp_text_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(timestamp_text(&a), "2026-03-01T09:00:00.000000Z");
    }

    #[tokio::test]
    async fn test_tokens_are_stored() {
        let backend = backend();
        let created = backend
            .create_session(NewFhirSession {
                provider: "epic".to_string(),
                access_token: "access".to_string(),
                refresh_token: Some("refresh".to_string()),
                fhir_server_url: "https://fhir.example/R4".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let read = backend.get_session(&created.id).await.unwrap().unwrap();
        assert_eq!(read.access_token, "access");
        assert_eq!(read.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn test_corrupt_enum_is_internal_error() {
        let backend = backend();
        {
            let conn = backend.get_connection().unwrap();
            conn.execute(
                "INSERT INTO health_alerts (id, kind, severity, title, message, created_at)
                 VALUES ('a1', 'bogus', 'info', 't', 'm', '2026-01-01T00:00:00.000000Z')",
                [],
            )
            .unwrap();
        }
        let err = backend.list_alerts(false).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Backend(BackendError::Internal { .. })
        ));
    }
}
