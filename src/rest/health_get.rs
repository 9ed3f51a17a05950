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

//! API to probe the liveness of the service.

use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Message of the health check response.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct HealthResponse {
    /// Fixed health indicator.
    status: String,

    /// Name of the service, to tell the two transports apart.
    service: String,
}

/// API handler.
pub(crate) async fn handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_owned(),
        service: "Library REST API".to_owned(),
    })
}
