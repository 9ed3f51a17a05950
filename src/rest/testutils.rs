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

//! Test utilities for the REST API.

use crate::clocks::testutils::SettableClock;
use crate::db::{self, Db};
use crate::driver::{DriverOptions, LibraryDriver};
use crate::model::{Book, Member};
use crate::rest::{app, ErrorResponse};
use axum::extract::Request;
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use time::macros::datetime;
use tower::util::ServiceExt;

/// Maximum body size for testing purposes.
const MAX_BODY_SIZE: usize = 4096;

/// State of a running test.
pub(crate) struct TestContext {
    /// The database the app is backed by, for direct inspection of its contents.
    db: Arc<dyn Db + Send + Sync>,

    /// The clock the app is backed by, for time manipulation.
    pub(crate) clock: Arc<SettableClock>,

    /// The router under test.
    app: Router,
}

impl TestContext {
    /// Initializes a test context serving the app from an in-memory database.
    pub(crate) async fn setup() -> Self {
        let db: Arc<dyn Db + Send + Sync> = Arc::from(db::sqlite::testutils::setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let clock = Arc::from(SettableClock::new(datetime!(2024-05-01 12:00:00 UTC)));
        let driver = LibraryDriver::new(db.clone(), clock.clone(), DriverOptions::default());
        let app = app(driver);
        Self { db, clock, app }
    }

    /// Returns the router under test.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Returns a driver backed by the same database as the app, to prepare or
    /// inspect state out of band.
    pub(crate) fn driver(&self) -> LibraryDriver {
        LibraryDriver::new(self.db.clone(), self.clock.clone(), DriverOptions::default())
    }

    /// Syntactic sugar to create a book with default details.
    pub(crate) async fn create_simple_book(&self, title: &str) -> Book {
        self.driver().create_book(title.to_owned(), "Some Author".to_owned(), None).await.unwrap()
    }

    /// Syntactic sugar to create a member whose email is derived from `name`.
    pub(crate) async fn create_simple_member(&self, name: &str) -> Member {
        self.driver()
            .create_member(name.to_owned(), format!("{}@example.com", name), None)
            .await
            .unwrap()
    }
}

/// Builder for a single request to the API server.
#[must_use]
pub(crate) struct OneShotBuilder {
    /// The router for the app being tested.
    app: Router,

    /// Builder for the request that will be sent to the app.
    builder: axum::http::request::Builder,
}

impl OneShotBuilder {
    /// Creates a new request against a given `method`/`uri` pair served by an `app` router.
    pub(crate) fn new<U: AsRef<str>>(app: Router, (method, uri): (http::Method, U)) -> Self {
        let builder = Request::builder().method(method).uri(uri.as_ref());
        Self { app, builder }
    }

    /// Finishes building the request and sends it with an empty payload.
    pub(crate) async fn send_empty(self) -> ResponseChecker {
        let request = self.builder.body(axum::body::Body::empty()).unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }

    /// Finishes building the request and sends it with a JSON payload.
    pub(crate) async fn send_json<T: Serialize>(self, request: T) -> ResponseChecker {
        let request = self
            .builder
            .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(axum::body::Body::from(serde_json::to_vec(&request).unwrap()))
            .unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }
}

/// Type alias for the complex type returned by the `oneshot` function.
type HttpResponse = axum::response::Response;

/// Validator for the outcome of a request sent by a `OneShotBuilder`.
#[must_use]
pub(crate) struct ResponseChecker {
    /// Actual response that we received from the app.
    response: HttpResponse,

    /// Expected HTTP status code in the response above.
    exp_status: http::StatusCode,
}

impl From<HttpResponse> for ResponseChecker {
    fn from(response: HttpResponse) -> Self {
        Self { response, exp_status: http::StatusCode::OK }
    }
}

impl ResponseChecker {
    /// Sets the expected exit HTTP status to `status`.
    pub(crate) fn expect_status(mut self, status: http::StatusCode) -> Self {
        self.exp_status = status;
        self
    }

    /// Performs common validation operations on the response.
    fn verify(&self) {
        assert_eq!(self.exp_status, self.response.status());
    }

    /// Finishes checking the response and expects its body to be an `ErrorResponse` whose
    /// code is `exp_code` and whose message matches `exp_re`.
    pub(crate) async fn expect_error(self, exp_code: &str, exp_re: &str) {
        let exp_status = self.exp_status;
        self.verify();

        let body = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
        let response: ErrorResponse = match serde_json::from_slice(&body) {
            Ok(response) => response,
            Err(e) => {
                let body = String::from_utf8(body.to_vec()).unwrap();
                panic!("Invalid error response due to {}; content was {}", e, body);
            }
        };
        assert_eq!(exp_code, response.error_code);
        assert_eq!(exp_status.as_u16(), response.status_code);
        let re = regex::Regex::new(exp_re).unwrap();
        assert!(
            re.is_match(&response.message),
            "Response content '{:?}' does not match re '{}'",
            response,
            exp_re
        );
    }

    /// Finishes checking the response and expects it to contain a valid JSON object of
    /// type `T`.
    pub(crate) async fn expect_json<T: DeserializeOwned>(self) -> T {
        self.verify();

        let body = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
        serde_json::from_slice::<T>(&body).unwrap()
    }
}
