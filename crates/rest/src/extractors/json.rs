//! JSON body extractor.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

use crate::error::RestError;

/// Like [`axum::Json`], but a malformed body answers with a 400
/// OperationOutcome instead of axum's plain-text rejection.
///
/// # Example
///
/// ```rust,ignore
/// use carebridge_rest::extractors::ValidJson;
///
/// async fn create(ValidJson(body): ValidJson<NewAppointment>) { /* ... */ }
/// ```
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

/// Error type for JSON extraction failures.
#[derive(Debug)]
pub struct JsonBodyRejection(JsonRejection);

impl IntoResponse for JsonBodyRejection {
    fn into_response(self) -> Response {
        RestError::BadRequest {
            message: self.0.body_text(),
        }
        .into_response()
    }
}

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = JsonBodyRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(JsonBodyRejection)?;
        Ok(ValidJson(value))
    }
}
