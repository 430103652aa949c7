//! Provider connection sessions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resources migrated per FHIR type name.
pub type MigrationCountMap = BTreeMap<String, u64>;

/// A connection to an external FHIR provider.
///
/// At most one session is current at a time. Ended sessions are kept with
/// their `ended_at` stamp. Tokens are never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FhirSession {
    pub id: String,
    /// Provider identifier, e.g. `epic-sandbox` or `demo`.
    pub provider: String,
    #[serde(skip_serializing, default)]
    pub access_token: String,
    #[serde(skip_serializing, default)]
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub fhir_server_url: String,
    pub patient_id: Option<String>,
    pub scope: Option<String>,
    pub is_current: bool,
    pub migrated: bool,
    pub migrated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub migration_counts: MigrationCountMap,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl FhirSession {
    /// A current, not yet migrated session built from `new`.
    pub fn from_new(id: String, new: NewFhirSession, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            provider: new.provider,
            access_token: new.access_token,
            refresh_token: new.refresh_token,
            token_expires_at: new.token_expires_at,
            fhir_server_url: new.fhir_server_url,
            patient_id: new.patient_id,
            scope: new.scope,
            is_current: true,
            migrated: false,
            migrated_at: None,
            migration_counts: MigrationCountMap::new(),
            created_at,
            ended_at: None,
        }
    }

    /// Whether the access token has passed its expiry.
    pub fn is_token_expired(&self, at: DateTime<Utc>) -> bool {
        self.token_expires_at.is_some_and(|expires| expires <= at)
    }
}

/// Parameters for a new session.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFhirSession {
    pub provider: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub fhir_server_url: String,
    pub patient_id: Option<String>,
    pub scope: Option<String>,
}
