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

//! API to remove a registered member.

use crate::driver::LibraryDriver;
use crate::errors::DomainError;
use crate::model::MemberId;
use crate::rest::{MessageResponse, RestPath};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

/// API handler.
pub(crate) async fn handler(
    State(driver): State<LibraryDriver>,
    RestPath(id): RestPath<MemberId>,
) -> Result<impl IntoResponse, DomainError> {
    driver.delete_member(id).await?;
    Ok(Json(MessageResponse { message: "Member deleted successfully".to_owned() }))
}
