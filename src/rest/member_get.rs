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

//! API to query one registered member.

use crate::driver::LibraryDriver;
use crate::errors::DomainError;
use crate::model::MemberId;
use crate::rest::RestPath;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

/// API handler.
pub(crate) async fn handler(
    State(driver): State<LibraryDriver>,
    RestPath(id): RestPath<MemberId>,
) -> Result<impl IntoResponse, DomainError> {
    let member = driver.get_member(id).await?;
    Ok(Json(member))
}

#[cfg(test)]
mod tests {
    use crate::rest::testutils::*;

    fn route(id: i64) -> (http::Method, String) {
        (http::Method::GET, format!("/members/{}", id))
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;

        let member = context.create_simple_member("jane").await;

        let response = OneShotBuilder::new(context.app(), route(member.id.as_i64()))
            .send_empty()
            .await
            .expect_json::<serde_json::Value>()
            .await;
        assert_eq!(member.id.as_i64(), response["id"].as_i64().unwrap());
        assert_eq!("jane", response["name"]);
        assert_eq!("jane@example.com", response["email"]);
    }

    #[tokio::test]
    async fn test_not_found() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route(123))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("RESOURCE_NOT_FOUND", "Member with ID 123 not found")
            .await;
    }
}
