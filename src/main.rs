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

//! Entry point to the library service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use library_service::clocks::SystemClock;
use library_service::db::postgres::{PostgresDb, PostgresOptions};
use library_service::db::{init_schema, Db};
use library_service::driver::DriverOptions;
use library_service::env::get_optional_var;
use library_service::serve;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Default port for the REST interface when `LIBRARY_REST_PORT` is not set.
const DEFAULT_REST_PORT: u16 = 3000;

/// Default port for the gRPC interface when `LIBRARY_GRPC_PORT` is not set.
const DEFAULT_GRPC_PORT: u16 = 50051;

#[tokio::main]
async fn main() {
    env_logger::init();

    let rest_port = get_optional_var::<u16>("LIBRARY", "REST_PORT")
        .unwrap()
        .unwrap_or(DEFAULT_REST_PORT);
    let grpc_port = get_optional_var::<u16>("LIBRARY", "GRPC_PORT")
        .unwrap()
        .unwrap_or(DEFAULT_GRPC_PORT);
    let opts = DriverOptions::from_env("LIBRARY").unwrap();

    let db_opts = PostgresOptions::from_env("LIBRARY_PGSQL").unwrap();
    let db = Arc::from(PostgresDb::connect(db_opts).unwrap());
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();

    serve(
        (Ipv4Addr::UNSPECIFIED, rest_port),
        (Ipv4Addr::UNSPECIFIED, grpc_port),
        db,
        Arc::from(SystemClock::default()),
        opts,
    )
    .await
    .unwrap()
}
