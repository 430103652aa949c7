//! Health alerts shown to the patient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::text_enum;

text_enum! {
    AlertKind ("alert kind") {
        AppointmentReminder => "appointment_reminder",
        Medication => "medication",
        LabResult => "lab_result",
        General => "general",
    }
}

text_enum! {
    AlertSeverity ("alert severity") {
        Info => "info",
        Warning => "warning",
        Urgent => "urgent",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthAlert {
    pub id: String,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    /// Generators set this so the same alert is not raised twice.
    pub dedup_key: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A new, unread alert.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHealthAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub dedup_key: Option<String>,
}
