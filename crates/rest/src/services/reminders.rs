//! Appointment reminders.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use carebridge_persistence::types::{
    AlertKind, AlertSeverity, Appointment, HealthAlert, NewHealthAlert,
};
use carebridge_persistence::{AppStorage, StorageResult};

/// Dedup key claimed by the reminder for `appointment_id`.
pub fn reminder_dedup_key(appointment_id: &str) -> String {
    format!("appointment-reminder:{}", appointment_id)
}

/// Whether `appointment` starts after `now` and no later than `window` ahead.
fn is_due(appointment: &Appointment, now: DateTime<Utc>, window: Duration) -> bool {
    let within_window = now
        .checked_add_signed(window)
        .is_none_or(|horizon| appointment.starts_at <= horizon);
    appointment.is_active() && appointment.starts_at > now && within_window
}

fn reminder_for(appointment: &Appointment) -> NewHealthAlert {
    let mut message = format!(
        "{} on {}",
        appointment.title,
        appointment.starts_at.format("%A, %B %-d at %H:%M UTC")
    );
    if let Some(provider) = &appointment.provider_name {
        message.push_str(&format!(" with {}", provider));
    }
    if let Some(location) = &appointment.location {
        message.push_str(&format!(" at {}", location));
    }

    NewHealthAlert {
        kind: AlertKind::AppointmentReminder,
        severity: AlertSeverity::Info,
        title: "Upcoming appointment".to_string(),
        message,
        dedup_key: Some(reminder_dedup_key(&appointment.id)),
    }
}

/// Raises one reminder per upcoming appointment.
///
/// An appointment is due when it is scheduled or confirmed and starts within
/// `days_before` days after `now`. Appointments that already have a reminder
/// are skipped. Returns the alerts created by this run.
pub async fn generate_appointment_reminders<S>(
    storage: &S,
    now: DateTime<Utc>,
    days_before: u32,
) -> StorageResult<Vec<HealthAlert>>
where
    S: AppStorage + ?Sized,
{
    let window = Duration::days(i64::from(days_before));
    let mut created = Vec::new();

    for appointment in storage.list_appointments().await? {
        if !is_due(&appointment, now, window) {
            continue;
        }

        let key = reminder_dedup_key(&appointment.id);
        if storage.alert_exists(&key).await? {
            debug!(appointment_id = %appointment.id, "Reminder already raised");
            continue;
        }

        created.push(storage.create_alert(reminder_for(&appointment)).await?);
    }

    info!(created = created.len(), days_before, "Appointment reminders generated");
    Ok(created)
}
