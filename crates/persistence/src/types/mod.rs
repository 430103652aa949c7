//! Records kept by Carebridge.
//!
//! Each entity has a stored form (with `id` and `created_at`) and a `New*`
//! form that callers hand to a store.

use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;

mod alert;
mod appointment;
mod chat;
mod digest;
mod form;
mod session;

pub use alert::{AlertKind, AlertSeverity, HealthAlert, NewHealthAlert};
pub use appointment::{Appointment, AppointmentStatus, NewAppointment};
pub use chat::{ChatMessage, ChatRole, NewChatMessage};
pub use digest::{HealthDigest, NewHealthDigest};
pub use form::{FieldSource, FormField, FormTemplate, NewFormTemplate, NewPrefilledForm, PrefilledForm};
pub use session::{FhirSession, MigrationCountMap, NewFhirSession};

/// A string did not name any variant of a closed set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Current time at the precision every backend stores (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Generates a new entity id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Declares a closed set of values stored and serialized as fixed strings.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::types::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::types::ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use text_enum;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_enum_round_trip() {
        for status in AppointmentStatus::ALL {
            assert_eq!(status.as_str().parse::<AppointmentStatus>().unwrap(), *status);
        }
        let err = "maybe".parse::<AppointmentStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown appointment status 'maybe'");
    }

    #[test]
    fn test_serde_uses_text() {
        assert_eq!(
            serde_json::to_value(AlertKind::AppointmentReminder).unwrap(),
            serde_json::json!("appointment_reminder")
        );
        assert_eq!(
            serde_json::from_value::<FieldSource>(serde_json::json!("active_conditions")).unwrap(),
            FieldSource::ActiveConditions
        );
    }

    #[test]
    fn test_now_is_microsecond_precision() {
        assert_eq!(now().timestamp_subsec_nanos() % 1_000, 0);
    }
}
