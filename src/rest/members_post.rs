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

//! API to register a new member.

use crate::driver::LibraryDriver;
use crate::errors::DomainError;
use crate::rest::RestJson;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

/// Message of the request to register a member.
#[derive(Debug, Deserialize)]
pub(crate) struct CreateMemberRequest {
    /// Name of the new member.
    name: String,

    /// Email address of the new member.
    email: String,

    /// Phone number of the new member, if known.
    #[serde(default)]
    phone: Option<String>,
}

/// API handler.
pub(crate) async fn handler(
    State(driver): State<LibraryDriver>,
    RestJson(request): RestJson<CreateMemberRequest>,
) -> Result<(http::StatusCode, impl IntoResponse), DomainError> {
    let member = driver.create_member(request.name, request.email, request.phone).await?;
    Ok((http::StatusCode::CREATED, Json(member)))
}

#[cfg(test)]
mod tests {
    use crate::rest::testutils::*;

    fn route() -> (http::Method, String) {
        (http::Method::POST, "/members".to_owned())
    }

    #[tokio::test]
    async fn test_create() {
        let context = TestContext::setup().await;

        let request = serde_json::json!({
            "name": "Jane Doe",
            "email": "Jane@Example.Com",
            "phone": "+1 (415) 555-0101",
        });
        let response = OneShotBuilder::new(context.app(), route())
            .send_json(request)
            .await
            .expect_status(http::StatusCode::CREATED)
            .expect_json::<serde_json::Value>()
            .await;
        assert_eq!("Jane Doe", response["name"]);
        assert_eq!("jane@example.com", response["email"]);
        assert_eq!("+14155550101", response["phone"]);
        assert_eq!("2024-05-01T12:00:00Z", response["created_at"]);
    }

    #[tokio::test]
    async fn test_missing_email() {
        let context = TestContext::setup().await;

        let request = serde_json::json!({"name": "Jane", "email": ""});
        OneShotBuilder::new(context.app(), route())
            .send_json(request)
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("REQUIRED_FIELD_MISSING", "email")
            .await;
    }

    #[tokio::test]
    async fn test_invalid_email() {
        let context = TestContext::setup().await;

        let request = serde_json::json!({"name": "Jane", "email": "not-an-email"});
        OneShotBuilder::new(context.app(), route())
            .send_json(request)
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("INVALID_FORMAT", "email")
            .await;
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let context = TestContext::setup().await;

        context.create_simple_member("jane").await;

        let request = serde_json::json!({"name": "Other Jane", "email": "JANE@EXAMPLE.COM"});
        OneShotBuilder::new(context.app(), route())
            .send_json(request)
            .await
            .expect_status(http::StatusCode::CONFLICT)
            .expect_error("RESOURCE_ALREADY_EXISTS", "jane@example.com")
            .await;
    }
}
