//! Record generators that run on request.
//!
//! - [`reminders`] - appointment reminder alerts
//! - [`digest`] - the weekly health digest
//! - [`prefill`] - filling form templates from a patient's record
//!
//! Generators take the current time as a parameter.

pub mod digest;
pub mod prefill;
pub mod reminders;

pub use digest::generate_weekly_digest;
pub use prefill::{PrefillResult, prefill_template};
pub use reminders::{generate_appointment_reminders, reminder_dedup_key};
