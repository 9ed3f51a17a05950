// Library Service
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Entry point to the REST server.
//!
//! Every API lives in its own `.rs` file, using a name like
//! `<entity>_<method>.rs`.  This may seem overkill, but putting every API in
//! its own file makes it easy to ensure all the integration tests for the
//! given API truly belong to that API.
//!
//! More specifically, the `tests` module within an API defines a `route`
//! method that returns the HTTP method and the API path under test.  All
//! integration tests within the module then rely on `route` to obtain this
//! information, ensuring that they all test the desired API.

use crate::driver::LibraryDriver;
use crate::errors::{DomainError, ErrorKind};
use async_trait::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod book_delete;
mod book_get;
mod book_put;
mod books_get;
mod books_post;
mod borrowings_get;
mod borrowings_member_get;
mod borrowings_post;
mod borrowings_return_post;
mod health_get;
mod member_delete;
mod member_get;
mod member_put;
mod members_get;
mod members_post;
#[cfg(test)]
mod testutils;

/// Creates the router for the application.
pub fn app(driver: LibraryDriver) -> Router {
    use axum::routing::{get, post};
    Router::new()
        .route("/books", get(books_get::handler).post(books_post::handler))
        .route(
            "/books/:id",
            get(book_get::handler).put(book_put::handler).delete(book_delete::handler),
        )
        .route("/members", get(members_get::handler).post(members_post::handler))
        .route(
            "/members/:id",
            get(member_get::handler).put(member_put::handler).delete(member_delete::handler),
        )
        .route("/borrowings", get(borrowings_get::handler).post(borrowings_post::handler))
        .route("/borrowings/return", post(borrowings_return_post::handler))
        .route("/borrowings/member/:id", get(borrowings_member_get::handler))
        .route("/health", get(health_get::handler))
        .with_state(driver)
}

/// A JSON body extractor whose rejection is a `DomainError`.
///
/// axum's own `Json` answers deserialization failures with a plain-text body,
/// which would be the only responses not to carry the structured error shape.
/// Routing the rejection through `DomainError` keeps the contract uniform.
pub(crate) struct RestJson<T>(pub(crate) T);

#[async_trait]
impl<S, T> FromRequest<S> for RestJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = DomainError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(RestJson(value)),
            Err(rejection) => {
                Err(DomainError::new(ErrorKind::ValidationError, rejection.body_text()))
            }
        }
    }
}

/// A path parameter extractor whose rejection is a `DomainError`.
///
/// Same motivation as `RestJson`: the `:id` captures must reject anything
/// that is not a positive integer with the structured error shape, not with
/// axum's plain-text response.
pub(crate) struct RestPath<T>(pub(crate) T);

#[async_trait]
impl<S, T> FromRequestParts<S> for RestPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = DomainError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(RestPath(value)),
            Err(rejection) => {
                Err(DomainError::new(ErrorKind::InvalidValue, rejection.body_text()))
            }
        }
    }
}

/// Representation of the details of an error response.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ErrorResponse {
    /// Name of the category the failed request's error belongs to.
    pub(crate) error: String,

    /// Textual representation of the error message.
    pub(crate) message: String,

    /// Stable machine-readable code of the error kind.
    pub(crate) error_code: String,

    /// Structured diagnostic details about the error.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) details: BTreeMap<String, String>,

    /// Name of the offending field, when the error concerns a single field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) field: Option<String>,

    /// HTTP status code of the response, duplicated into the body.
    pub(crate) status_code: u16,
}

/// Representation of the informational body of a response with no entity.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct MessageResponse {
    /// Textual representation of the outcome of the request.
    pub(crate) message: String,
}

impl IntoResponse for DomainError {
    fn into_response(self) -> axum::response::Response {
        let status = self.kind.http_status();
        let response = ErrorResponse {
            error: self.kind.category().as_str().to_owned(),
            message: self.message,
            error_code: self.kind.code().to_owned(),
            details: self.details,
            field: self.field,
            status_code: status.as_u16(),
        };
        (status, Json(response)).into_response()
    }
}
