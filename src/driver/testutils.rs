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

//! Utilities to help testing driver operations.

use crate::clocks::testutils::SettableClock;
use crate::db::{self, Db};
use crate::driver::{DriverOptions, LibraryDriver};
use crate::model::{Book, BookId, Member, MemberId};
use std::sync::Arc;
use time::macros::datetime;

/// State of a running test.
pub(crate) struct TestContext {
    /// The database the driver is backed by, for direct inspection of its contents.
    pub(crate) db: Arc<dyn Db + Send + Sync>,

    /// The clock the driver is backed by, for time manipulation.
    pub(crate) clock: Arc<SettableClock>,

    /// Configuration of the driver under test.
    opts: DriverOptions,
}

impl TestContext {
    /// Initializes a test context with an in-memory database and a settable clock.
    pub(crate) async fn setup() -> Self {
        let db = Arc::from(db::sqlite::testutils::setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let clock = Arc::from(SettableClock::new(datetime!(2024-05-01 12:00:00 UTC)));
        TestContext { db, clock, opts: DriverOptions::default() }
    }

    /// Returns a driver instance for a one-shot operation.
    pub(crate) fn driver(&self) -> LibraryDriver {
        LibraryDriver::new(self.db.clone(), self.clock.clone(), self.opts.clone())
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

    /// Fetches the book `id` straight from the database.
    pub(crate) async fn get_book(&self, id: BookId) -> Book {
        db::get_book(&mut self.db.ex().await.unwrap(), id).await.unwrap()
    }

    /// Fetches the member `id` straight from the database.
    pub(crate) async fn get_member(&self, id: MemberId) -> Member {
        db::get_member(&mut self.db.ex().await.unwrap(), id).await.unwrap()
    }
}
