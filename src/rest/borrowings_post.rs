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

//! API to borrow a book for a member.

use crate::driver::LibraryDriver;
use crate::errors::DomainError;
use crate::model::{BookId, MemberId};
use crate::rest::RestJson;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

/// Message of the request to borrow a book.
#[derive(Debug, Deserialize)]
pub(crate) struct BorrowRequest {
    /// Identifier of the book to borrow.
    book_id: BookId,

    /// Identifier of the member borrowing the book.
    member_id: MemberId,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<LibraryDriver>,
    RestJson(request): RestJson<BorrowRequest>,
) -> Result<(http::StatusCode, impl IntoResponse), DomainError> {
    let borrowing = driver.borrow_book(request.book_id, request.member_id).await?;
    Ok((http::StatusCode::CREATED, Json(borrowing)))
}
