//! Storage traits.
//!
//! One trait per record kind, all `async` and object-safe:
//!
//! - [`SessionStore`] - provider sessions and the single current session
//! - [`ChatStore`] - chat history
//! - [`AppointmentStore`] - appointments
//! - [`FormStore`] - form templates and prefilled forms
//! - [`AlertStore`] - health alerts
//! - [`DigestStore`] - weekly digests
//!
//! [`AppStorage`] bundles them; it is what the REST layer holds.

mod stores;

pub use stores::{
    AlertStore, AppStorage, AppointmentStore, ChatStore, DigestStore, FormStore, SessionStore,
};
