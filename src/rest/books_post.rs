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

//! API to add a book to the catalog.

use crate::driver::LibraryDriver;
use crate::errors::DomainError;
use crate::rest::RestJson;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

/// Message of the request to create a book.
#[derive(Debug, Deserialize)]
pub(crate) struct CreateBookRequest {
    /// Title of the new book.
    title: String,

    /// Author of the new book.
    author: String,

    /// ISBN of the new book, if known.
    #[serde(default)]
    isbn: Option<String>,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<LibraryDriver>,
    RestJson(request): RestJson<CreateBookRequest>,
) -> Result<(http::StatusCode, impl IntoResponse), DomainError> {
    let book = driver.create_book(request.title, request.author, request.isbn).await?;
    Ok((http::StatusCode::CREATED, Json(book)))
}
