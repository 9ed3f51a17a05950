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

//! Library catalog management service.
//!
//! The service tracks books, members and the borrowings that tie them
//! together, and exposes the same operations over two parallel transports:
//! a REST API and a gRPC API.  The code is structured as a stack of layers,
//! and errors float transparently from the bottom to the top where each
//! transport translates them to its own status codes:
//!
//! 1.  `model`: High-level data types representing concepts in the library
//!     domain.  Extensive use of the newtype pattern; all field validation
//!     lives here and nowhere else.
//!
//! 1.  `db`: The persistence layer.  Provides a thin abstraction over
//!     PostgreSQL (production) and SQLite (tests) plus free functions that
//!     implement the entity queries for both backends.
//!
//! 1.  `driver`: The business logic layer.  `LibraryDriver` coordinates
//!     every operation against the database inside a single transaction and
//!     owns no state of its own between calls.
//!
//! 1.  `rest` and `grpc`: The transport adapters.  Both are thin translators
//!     between wire requests and driver calls; neither contains any business
//!     logic.
//!
//! 1.  `main`: The app launcher.  Its sole purpose is to gather configuration
//!     data from environment variables and call `serve`.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use crate::clocks::Clock;
use crate::db::Db;
use crate::driver::{DriverOptions, LibraryDriver};
use crate::grpc::proto::library_service_server::LibraryServiceServer;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub mod clocks;
pub mod db;
pub mod driver;
pub mod env;
pub mod errors;
pub mod grpc;
pub mod model;
pub mod rest;

/// Instantiates all resources and serves the application on the two given
/// addresses, one per transport.
///
/// While it'd be nice to push this responsibility to `main`, doing so would
/// force us to expose many crate-internal types to the public, which in turn
/// would make dead code detection harder.
pub async fn serve(
    rest_addr: impl Into<SocketAddr>,
    grpc_addr: impl Into<SocketAddr>,
    db: Arc<dyn Db + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    opts: DriverOptions,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let driver = LibraryDriver::new(db, clock, opts);

    let rest_addr = rest_addr.into();
    let grpc_addr = grpc_addr.into();

    let rest_app = rest::app(driver.clone());
    let grpc_service = LibraryServiceServer::new(grpc::LibraryServiceImpl::new(driver));

    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    log::info!("REST interface listening on {}", rest_addr);
    log::info!("gRPC interface listening on {}", grpc_addr);

    tokio::try_join!(
        async {
            axum::serve(listener, rest_app.into_make_service())
                .await
                .map_err(|e| Box::from(e) as Box<dyn Error + Send + Sync>)
        },
        async {
            tonic::transport::Server::builder()
                .add_service(grpc_service)
                .serve(grpc_addr)
                .await
                .map_err(|e| Box::from(e) as Box<dyn Error + Send + Sync>)
        },
    )?;
    Ok(())
}
