//! Query string extractor.

use axum::{
    extract::{FromRequestParts, Query, rejection::QueryRejection},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

use crate::error::RestError;

/// Like [`axum::extract::Query`], but an unparseable query string answers
/// with a 400 OperationOutcome.
#[derive(Debug)]
pub struct ValidQuery<T>(pub T);

/// Error type for query extraction failures.
#[derive(Debug)]
pub struct QueryStringRejection(QueryRejection);

impl IntoResponse for QueryStringRejection {
    fn into_response(self) -> Response {
        RestError::BadRequest {
            message: self.0.body_text(),
        }
        .into_response()
    }
}

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = QueryStringRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(QueryStringRejection)?;
        Ok(ValidQuery(value))
    }
}
