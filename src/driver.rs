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

//! Business logic for the library catalog.
//!
//! The driver is the only layer that talks to the database, and it does so
//! with one transaction per mutating operation.  Transports hand it already
//! deserialized (but not yet validated) input and receive either model types
//! or a `DomainError`; the driver never returns transport-specific types.

use crate::clocks::Clock;
use crate::db::{Db, DbError};
use crate::env::get_optional_var;
use crate::errors::{DomainError, DomainResult, ErrorKind};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

mod books;
mod borrowings;
mod members;
#[cfg(test)]
pub(crate) mod testutils;

pub use books::BookPatch;
pub use members::MemberPatch;

/// Default value for the `REQUEST_TIMEOUT` setting when not specified.
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Configuration options for the library driver.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct DriverOptions {
    /// The maximum amount of time one operation may take before it is aborted.
    pub request_timeout: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self { request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS) }
    }
}

impl DriverOptions {
    /// Creates a new set of options from environment variables.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            request_timeout: get_optional_var::<Duration>(prefix, "REQUEST_TIMEOUT")?
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS)),
        })
    }
}

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Clone)]
pub struct LibraryDriver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// Clock instance to obtain the current time.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Configuration options.
    opts: DriverOptions,
}

impl LibraryDriver {
    /// Creates a new driver backed by the given dependencies.
    pub fn new(
        db: Arc<dyn Db + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        opts: DriverOptions,
    ) -> Self {
        Self { db, clock, opts }
    }

    /// Runs `fut` as the body of the operation named `op`, enforcing the configured time
    /// budget on it.
    ///
    /// A transaction held by an expired `fut` is dropped here and thus rolled back, so an
    /// operation that timed out never leaves partial writes behind.
    async fn run<T, F>(timeout: Duration, op: &str, fut: F) -> DomainResult<T>
    where
        F: Future<Output = DomainResult<T>>,
    {
        let result = match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::timeout(op)),
        };
        if let Err(e) = &result {
            e.log(op);
        }
        result
    }
}

/// Converts a failure to commit a transaction into a `DomainError`.
fn commit_error(e: DbError) -> DomainError {
    log::error!("Transaction commit failed: {}", e);
    let mut error = DomainError::new(ErrorKind::TransactionError, "Could not commit transaction");
    error.cause = Some(e.to_string());
    error
}
