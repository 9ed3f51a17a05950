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

//! API to return a previously borrowed book.

use crate::driver::LibraryDriver;
use crate::errors::DomainError;
use crate::model::{BookId, MemberId};
use crate::rest::RestJson;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

/// Message of the request to return a book.
#[derive(Debug, Deserialize)]
pub(crate) struct ReturnRequest {
    /// Identifier of the book being returned.
    book_id: BookId,

    /// Identifier of the member returning the book.
    member_id: MemberId,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<LibraryDriver>,
    RestJson(request): RestJson<ReturnRequest>,
) -> Result<impl IntoResponse, DomainError> {
    let borrowing = driver.return_book(request.book_id, request.member_id).await?;
    Ok(Json(borrowing))
}

#[cfg(test)]
mod tests {
    use crate::rest::testutils::*;
    use std::time::Duration;

    fn route() -> (http::Method, String) {
        (http::Method::POST, "/borrowings/return".to_owned())
    }

    #[tokio::test]
    async fn test_return() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("The Title").await;
        let member = context.create_simple_member("jane").await;
        let borrowing = context.driver().borrow_book(book.id, member.id).await.unwrap();
        context.clock.advance(Duration::from_secs(24 * 60 * 60));

        let request =
            serde_json::json!({"book_id": book.id.as_i64(), "member_id": member.id.as_i64()});
        let response = OneShotBuilder::new(context.app(), route())
            .send_json(request)
            .await
            .expect_json::<serde_json::Value>()
            .await;
        assert_eq!(borrowing.id.as_i64(), response["id"].as_i64().unwrap());
        assert_eq!("2024-05-01T12:00:00Z", response["borrow_date"]);
        assert_eq!("2024-05-02T12:00:00Z", response["return_date"]);
        assert_eq!(true, response["is_returned"]);
    }

    #[tokio::test]
    async fn test_not_borrowed() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("The Title").await;
        let member = context.create_simple_member("jane").await;

        let request =
            serde_json::json!({"book_id": book.id.as_i64(), "member_id": member.id.as_i64()});
        OneShotBuilder::new(context.app(), route())
            .send_json(request)
            .await
            .expect_status(http::StatusCode::FORBIDDEN)
            .expect_error("OPERATION_NOT_ALLOWED", "no active borrowing")
            .await;
    }

    #[tokio::test]
    async fn test_member_not_found() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("The Title").await;

        let request = serde_json::json!({"book_id": book.id.as_i64(), "member_id": 123});
        OneShotBuilder::new(context.app(), route())
            .send_json(request)
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("RESOURCE_NOT_FOUND", "Member with ID 123 not found")
            .await;
    }
}
