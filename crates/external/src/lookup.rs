//! The result of an adapter call.

use serde::{Deserialize, Serialize};

/// Either the data that was asked for, or a note that the upstream could not
/// provide it right now.
///
/// Serialized with a `status` tag:
///
/// ```json
/// {"status": "ok", "data": {...}}
/// {"status": "degraded", "reason": "ClinicalTrials.gov is temporarily unavailable"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Lookup<T> {
    /// The upstream answered.
    Ok { data: T },
    /// The upstream failed; `reason` is safe to show to a user.
    Degraded { reason: String },
}

impl<T> Lookup<T> {
    /// Wraps a successful answer.
    pub fn ok(data: T) -> Self {
        Lookup::Ok { data }
    }

    /// Creates a degraded result.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Lookup::Degraded {
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Lookup::Degraded { .. })
    }

    /// The data, if the upstream answered.
    pub fn into_data(self) -> Option<T> {
        match self {
            Lookup::Ok { data } => Some(data),
            Lookup::Degraded { .. } => None,
        }
    }

    /// Borrowing variant of [`Lookup::into_data`].
    pub fn data(&self) -> Option<&T> {
        match self {
            Lookup::Ok { data } => Some(data),
            Lookup::Degraded { .. } => None,
        }
    }

    /// Transforms the data, keeping a degraded result as is.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Ok { data } => Lookup::Ok { data: f(data) },
            Lookup::Degraded { reason } => Lookup::Degraded { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialized_shape() {
        let ok: Lookup<Vec<u32>> = Lookup::ok(vec![1, 2]);
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "ok", "data": [1, 2]})
        );

        let degraded: Lookup<Vec<u32>> = Lookup::degraded("down");
        assert_eq!(
            serde_json::to_value(&degraded).unwrap(),
            json!({"status": "degraded", "reason": "down"})
        );
    }

    #[test]
    fn test_option_payload_serializes() {
        let none: Lookup<Option<String>> = Lookup::ok(None);
        assert_eq!(
            serde_json::to_value(&none).unwrap(),
            json!({"status": "ok", "data": null})
        );
    }

    #[test]
    fn test_map_keeps_degraded() {
        let degraded: Lookup<u32> = Lookup::degraded("down");
        let mapped = degraded.map(|n| n + 1);
        assert!(mapped.is_degraded());
        assert_eq!(Lookup::ok(1).map(|n| n + 1).into_data(), Some(2));
    }
}
