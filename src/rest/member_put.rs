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

//! API to update a registered member.  Absent fields keep their current value.

use crate::driver::{LibraryDriver, MemberPatch};
use crate::errors::DomainError;
use crate::model::MemberId;
use crate::rest::{RestJson, RestPath};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

/// API handler.
pub(crate) async fn handler(
    State(driver): State<LibraryDriver>,
    RestPath(id): RestPath<MemberId>,
    RestJson(patch): RestJson<MemberPatch>,
) -> Result<impl IntoResponse, DomainError> {
    let member = driver.update_member(id, patch).await?;
    Ok(Json(member))
}
