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

//! API to update a book in the catalog.  Absent fields keep their current value.

use crate::driver::{BookPatch, LibraryDriver};
use crate::errors::DomainError;
use crate::model::BookId;
use crate::rest::{RestJson, RestPath};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

/// API handler.
pub(crate) async fn handler(
    State(driver): State<LibraryDriver>,
    RestPath(id): RestPath<BookId>,
    RestJson(patch): RestJson<BookPatch>,
) -> Result<impl IntoResponse, DomainError> {
    let book = driver.update_book(id, patch).await?;
    Ok(Json(book))
}

#[cfg(test)]
mod tests {
    use crate::rest::testutils::*;
    use std::time::Duration;

    fn route(id: i64) -> (http::Method, String) {
        (http::Method::PUT, format!("/books/{}", id))
    }

    #[tokio::test]
    async fn test_partial_update() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("Before").await;
        context.clock.advance(Duration::from_secs(60));

        let response = OneShotBuilder::new(context.app(), route(book.id.as_i64()))
            .send_json(serde_json::json!({"title": "After"}))
            .await
            .expect_json::<serde_json::Value>()
            .await;
        assert_eq!("After", response["title"]);
        assert_eq!("Some Author", response["author"]);
        assert_eq!("2024-05-01T12:00:00Z", response["created_at"]);
        assert_eq!("2024-05-01T12:01:00Z", response["updated_at"]);
    }

    #[tokio::test]
    async fn test_clear_isbn() {
        let context = TestContext::setup().await;

        let book = context
            .driver()
            .create_book("T".to_owned(), "A".to_owned(), Some("9780747532699".to_owned()))
            .await
            .unwrap();

        let response = OneShotBuilder::new(context.app(), route(book.id.as_i64()))
            .send_json(serde_json::json!({"isbn": ""}))
            .await
            .expect_json::<serde_json::Value>()
            .await;
        assert_eq!(serde_json::Value::Null, response["isbn"]);
    }

    #[tokio::test]
    async fn test_not_found() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route(123))
            .send_json(serde_json::json!({"title": "After"}))
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("RESOURCE_NOT_FOUND", "Book with ID 123 not found")
            .await;
    }

    #[tokio::test]
    async fn test_invalid_isbn() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("The Title").await;

        OneShotBuilder::new(context.app(), route(book.id.as_i64()))
            .send_json(serde_json::json!({"isbn": "123"}))
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("INVALID_FORMAT", "ISBN")
            .await;
    }
}
