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

//! The persistence layer for the library catalog.
//!
//! This module provides a thin abstraction over different database systems
//! plus the entity queries that the driver issues through it.  The PostgreSQL
//! backend is for production use and the SQLite backend is primarily intended
//! to support unit tests.
//!
//! The queries know nothing about business rules: they return raw outcomes
//! (`NotFound`, `AlreadyExists` and the like) and the driver decides what
//! those mean for the operation at hand.  The single exception is the active
//! borrowing invariant, which lives here by necessity: a partial unique index
//! over active borrowings makes the database reject a second concurrent
//! borrowing of the same book even when two transactions race.

use crate::model::{
    Book, BookId, Borrowing, BorrowingId, EmailAddress, Isbn, Member, MemberId, ModelError, Phone,
};
use async_trait::async_trait;
use sqlx::Row;
use time::OffsetDateTime;

#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(any(feature = "sqlite", test))]
pub mod sqlite;

#[cfg(any(feature = "sqlite", test))]
use crate::db::sqlite::{build_timestamp, unpack_timestamp};


/// Database errors.  Any unexpected errors that come from the database are classified as
/// `BackendError`, but errors we know about have more specific types.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DbError {
    /// Indicates that a request to create an entry failed because it already exists.
    #[error("Already exists")]
    AlreadyExists,

    /// Catch-all error type for unexpected database errors.
    #[error("Database error: {0}")]
    BackendError(String),

    /// Indicates a failure processing the data that already exists in the database.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// Indicates that a requested entry does not exist.
    #[error("Entity not found")]
    NotFound,

    /// Indicates that the database is not available (maybe because of too many active concurrent
    /// connections).
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// A database executor that can talk to multiple database implementations.
///
/// Users of this type are forced to destructure it and issue different queries for each
/// database, which is needed because the two systems differ in their placeholder syntax and
/// in their representation of timestamps.
///
/// Note that this can wrap an executor that talks directly to a pool or to an open transaction.
pub enum Executor {
    /// A PostgreSQL executor that can be used in `sqlx` operations.
    #[cfg(feature = "postgres")]
    Postgres(postgres::PostgresExecutor),

    /// A SQLite executor that can be used in `sqlx` operations.
    #[cfg(any(feature = "sqlite", test))]
    Sqlite(sqlite::SqliteExecutor),
}

/// A wrapper for a database executor backed by an open transaction.
pub struct TxExecutor(Executor);

impl TxExecutor {
    /// Returns the executor wrapped by this transaction.
    ///
    /// This would be better called `executor` but this method is used so frequently that it makes
    /// call sites too verbose.
    pub fn ex(&mut self) -> &mut Executor {
        &mut self.0
    }

    /// Commits the transaction.
    pub async fn commit(self) -> DbResult<()> {
        match self.0 {
            #[cfg(feature = "postgres")]
            Executor::Postgres(e) => e.commit().await,

            #[cfg(any(feature = "sqlite", test))]
            Executor::Sqlite(e) => e.commit().await,
        }
    }
}

/// Abstraction over the database connection.
#[async_trait]
pub trait Db {
    /// Obtains an executor for direct access to the pool.
    ///
    /// This would be better called `executor` but this method is used so frequently that it makes
    /// call sites too verbose.
    async fn ex(&self) -> DbResult<Executor>;

    /// Begins a transaction.
    ///
    /// It is the responsibility of the caller to call `commit` on the returned executor.  Otherwise
    /// the transaction is rolled back on drop.
    async fn begin(&self) -> DbResult<TxExecutor>;

    /// Closes the connection pool.
    async fn close(&self);
}

/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("db/postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("db/sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Book {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let title: String = row.try_get("title").map_err(postgres::map_sqlx_error)?;
        let author: String = row.try_get("author").map_err(postgres::map_sqlx_error)?;
        let isbn: Option<String> = row.try_get("isbn").map_err(postgres::map_sqlx_error)?;
        let created_at: OffsetDateTime =
            row.try_get("created_at").map_err(postgres::map_sqlx_error)?;
        let updated_at: OffsetDateTime =
            row.try_get("updated_at").map_err(postgres::map_sqlx_error)?;

        let id = BookId::new(id)?;
        let isbn = match isbn {
            Some(isbn) => Some(Isbn::new(isbn)?),
            None => None,
        };

        Ok(Book { id, title, author, isbn, created_at, updated_at })
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Member {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(postgres::map_sqlx_error)?;
        let phone: Option<String> = row.try_get("phone").map_err(postgres::map_sqlx_error)?;
        let created_at: OffsetDateTime =
            row.try_get("created_at").map_err(postgres::map_sqlx_error)?;
        let updated_at: OffsetDateTime =
            row.try_get("updated_at").map_err(postgres::map_sqlx_error)?;

        let id = MemberId::new(id)?;
        let email = EmailAddress::new(email)?;
        let phone = match phone {
            Some(phone) => Some(Phone::new(phone)?),
            None => None,
        };

        Ok(Member { id, name, email, phone, created_at, updated_at })
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Borrowing {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let book_id: i64 = row.try_get("book_id").map_err(postgres::map_sqlx_error)?;
        let member_id: i64 = row.try_get("member_id").map_err(postgres::map_sqlx_error)?;
        let borrow_date: OffsetDateTime =
            row.try_get("borrow_date").map_err(postgres::map_sqlx_error)?;
        let return_date: Option<OffsetDateTime> =
            row.try_get("return_date").map_err(postgres::map_sqlx_error)?;

        Ok(Borrowing {
            id: BorrowingId::new(id)?,
            book_id: BookId::new(book_id)?,
            member_id: MemberId::new(member_id)?,
            borrow_date,
            return_date,
        })
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Book {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let title: String = row.try_get("title").map_err(sqlite::map_sqlx_error)?;
        let author: String = row.try_get("author").map_err(sqlite::map_sqlx_error)?;
        let isbn: Option<String> = row.try_get("isbn").map_err(sqlite::map_sqlx_error)?;
        let created_secs: i64 = row.try_get("created_secs").map_err(sqlite::map_sqlx_error)?;
        let created_nsecs: i64 = row.try_get("created_nsecs").map_err(sqlite::map_sqlx_error)?;
        let updated_secs: i64 = row.try_get("updated_secs").map_err(sqlite::map_sqlx_error)?;
        let updated_nsecs: i64 = row.try_get("updated_nsecs").map_err(sqlite::map_sqlx_error)?;

        let id = BookId::new(id)?;
        let isbn = match isbn {
            Some(isbn) => Some(Isbn::new(isbn)?),
            None => None,
        };
        let created_at = build_timestamp(created_secs, created_nsecs)?;
        let updated_at = build_timestamp(updated_secs, updated_nsecs)?;

        Ok(Book { id, title, author, isbn, created_at, updated_at })
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Member {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(sqlite::map_sqlx_error)?;
        let phone: Option<String> = row.try_get("phone").map_err(sqlite::map_sqlx_error)?;
        let created_secs: i64 = row.try_get("created_secs").map_err(sqlite::map_sqlx_error)?;
        let created_nsecs: i64 = row.try_get("created_nsecs").map_err(sqlite::map_sqlx_error)?;
        let updated_secs: i64 = row.try_get("updated_secs").map_err(sqlite::map_sqlx_error)?;
        let updated_nsecs: i64 = row.try_get("updated_nsecs").map_err(sqlite::map_sqlx_error)?;

        let id = MemberId::new(id)?;
        let email = EmailAddress::new(email)?;
        let phone = match phone {
            Some(phone) => Some(Phone::new(phone)?),
            None => None,
        };
        let created_at = build_timestamp(created_secs, created_nsecs)?;
        let updated_at = build_timestamp(updated_secs, updated_nsecs)?;

        Ok(Member { id, name, email, phone, created_at, updated_at })
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Borrowing {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let book_id: i64 = row.try_get("book_id").map_err(sqlite::map_sqlx_error)?;
        let member_id: i64 = row.try_get("member_id").map_err(sqlite::map_sqlx_error)?;
        let borrow_secs: i64 = row.try_get("borrow_secs").map_err(sqlite::map_sqlx_error)?;
        let borrow_nsecs: i64 = row.try_get("borrow_nsecs").map_err(sqlite::map_sqlx_error)?;
        let return_secs: Option<i64> =
            row.try_get("return_secs").map_err(sqlite::map_sqlx_error)?;
        let return_nsecs: Option<i64> =
            row.try_get("return_nsecs").map_err(sqlite::map_sqlx_error)?;

        let borrow_date = build_timestamp(borrow_secs, borrow_nsecs)?;
        let return_date = match (return_secs, return_nsecs) {
            (Some(secs), Some(nsecs)) => Some(build_timestamp(secs, nsecs)?),
            (None, None) => None,
            (_, _) => {
                return Err(DbError::DataIntegrityError(
                    "Inconsistent values for return_date".to_owned(),
                ));
            }
        };

        Ok(Borrowing {
            id: BorrowingId::new(id)?,
            book_id: BookId::new(book_id)?,
            member_id: MemberId::new(member_id)?,
            borrow_date,
            return_date,
        })
    }
}

/// Creates a new book with the given details and returns its identifier.  Both timestamps are
/// set to `now`.
pub(crate) async fn create_book(
    ex: &mut Executor,
    title: &str,
    author: &str,
    isbn: Option<&Isbn>,
    now: OffsetDateTime,
) -> DbResult<BookId> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO books (title, author, isbn, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $4)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(title)
                .bind(author)
                .bind(isbn.map(Isbn::as_str))
                .bind(now)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (now_secs, now_nsecs) = unpack_timestamp(now);

            let query_str = "
                INSERT INTO books
                    (title, author, isbn, created_secs, created_nsecs, updated_secs, updated_nsecs)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(title)
                .bind(author)
                .bind(isbn.map(Isbn::as_str))
                .bind(now_secs)
                .bind(now_nsecs)
                .bind(now_secs)
                .bind(now_nsecs)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(BookId::new(id)?)
}

/// Gets the book with identifier `id`.
pub(crate) async fn get_book(ex: &mut Executor, id: BookId) -> DbResult<Book> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM books WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Book::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM books WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Book::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Lists all books in the catalog, oldest first.
pub(crate) async fn list_books(ex: &mut Executor) -> DbResult<Vec<Book>> {
    let rows = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM books ORDER BY id";
            let rows = sqlx::query(query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter().map(Book::try_from).collect::<DbResult<Vec<Book>>>()?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM books ORDER BY id";
            let rows = sqlx::query(query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter().map(Book::try_from).collect::<DbResult<Vec<Book>>>()?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(rows)
}

/// Persists the current state of `book`, including its `updated_at` timestamp.
pub(crate) async fn update_book(ex: &mut Executor, book: &Book) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE books SET title = $1, author = $2, isbn = $3, updated_at = $4
                WHERE id = $5";
            let done = sqlx::query(query_str)
                .bind(&book.title)
                .bind(&book.author)
                .bind(book.isbn.as_ref().map(Isbn::as_str))
                .bind(book.updated_at)
                .bind(book.id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (updated_secs, updated_nsecs) = unpack_timestamp(book.updated_at);

            let query_str = "
                UPDATE books SET title = ?, author = ?, isbn = ?, updated_secs = ?,
                    updated_nsecs = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(&book.title)
                .bind(&book.author)
                .bind(book.isbn.as_ref().map(Isbn::as_str))
                .bind(updated_secs)
                .bind(updated_nsecs)
                .bind(book.id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Update affected more than one row".to_owned())),
    }
}

/// Deletes the book with identifier `id`.
pub(crate) async fn delete_book(ex: &mut Executor, id: BookId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM books WHERE id = $1";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM books WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Delete affected more than one row".to_owned())),
    }
}

/// Creates a new member with the given details and returns its identifier.  Both timestamps are
/// set to `now`.
pub(crate) async fn create_member(
    ex: &mut Executor,
    name: &str,
    email: &EmailAddress,
    phone: Option<&Phone>,
    now: OffsetDateTime,
) -> DbResult<MemberId> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO members (name, email, phone, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $4)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(name)
                .bind(email.as_str())
                .bind(phone.map(Phone::as_str))
                .bind(now)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (now_secs, now_nsecs) = unpack_timestamp(now);

            let query_str = "
                INSERT INTO members
                    (name, email, phone, created_secs, created_nsecs, updated_secs, updated_nsecs)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(name)
                .bind(email.as_str())
                .bind(phone.map(Phone::as_str))
                .bind(now_secs)
                .bind(now_nsecs)
                .bind(now_secs)
                .bind(now_nsecs)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(MemberId::new(id)?)
}

/// Gets the member with identifier `id`.
pub(crate) async fn get_member(ex: &mut Executor, id: MemberId) -> DbResult<Member> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM members WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Member::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM members WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Member::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Lists all registered members, oldest first.
pub(crate) async fn list_members(ex: &mut Executor) -> DbResult<Vec<Member>> {
    let rows = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM members ORDER BY id";
            let rows = sqlx::query(query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter().map(Member::try_from).collect::<DbResult<Vec<Member>>>()?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM members ORDER BY id";
            let rows = sqlx::query(query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter().map(Member::try_from).collect::<DbResult<Vec<Member>>>()?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(rows)
}

/// Persists the current state of `member`, including its `updated_at` timestamp.
pub(crate) async fn update_member(ex: &mut Executor, member: &Member) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE members SET name = $1, email = $2, phone = $3, updated_at = $4
                WHERE id = $5";
            let done = sqlx::query(query_str)
                .bind(&member.name)
                .bind(member.email.as_str())
                .bind(member.phone.as_ref().map(Phone::as_str))
                .bind(member.updated_at)
                .bind(member.id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (updated_secs, updated_nsecs) = unpack_timestamp(member.updated_at);

            let query_str = "
                UPDATE members SET name = ?, email = ?, phone = ?, updated_secs = ?,
                    updated_nsecs = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(&member.name)
                .bind(member.email.as_str())
                .bind(member.phone.as_ref().map(Phone::as_str))
                .bind(updated_secs)
                .bind(updated_nsecs)
                .bind(member.id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Update affected more than one row".to_owned())),
    }
}

/// Deletes the member with identifier `id`.
pub(crate) async fn delete_member(ex: &mut Executor, id: MemberId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM members WHERE id = $1";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM members WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Delete affected more than one row".to_owned())),
    }
}

/// Creates a new active borrowing of `book_id` by `member_id` at `borrow_date` and returns its
/// identifier.
///
/// The insertion hits the partial unique index over active borrowings, so a concurrent attempt
/// to borrow the same book surfaces here as `AlreadyExists` no matter how the two transactions
/// interleave.
pub(crate) async fn create_borrowing(
    ex: &mut Executor,
    book_id: BookId,
    member_id: MemberId,
    borrow_date: OffsetDateTime,
) -> DbResult<BorrowingId> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO borrowings (book_id, member_id, borrow_date)
                VALUES ($1, $2, $3)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(book_id.as_i64())
                .bind(member_id.as_i64())
                .bind(borrow_date)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (borrow_secs, borrow_nsecs) = unpack_timestamp(borrow_date);

            let query_str = "
                INSERT INTO borrowings (book_id, member_id, borrow_secs, borrow_nsecs)
                VALUES (?, ?, ?, ?)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(book_id.as_i64())
                .bind(member_id.as_i64())
                .bind(borrow_secs)
                .bind(borrow_nsecs)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(BorrowingId::new(id)?)
}

/// Gets the borrowing with identifier `id`.
pub(crate) async fn get_borrowing(ex: &mut Executor, id: BorrowingId) -> DbResult<Borrowing> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM borrowings WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Borrowing::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM borrowings WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Borrowing::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Finds the active borrowing of `book_id`, if any.  At most one can exist at a time.
pub(crate) async fn find_active_borrowing_for_book(
    ex: &mut Executor,
    book_id: BookId,
) -> DbResult<Option<Borrowing>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT * FROM borrowings WHERE book_id = $1 AND return_date IS NULL";
            let row = sqlx::query(query_str)
                .bind(book_id.as_i64())
                .fetch_optional(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.map(Borrowing::try_from).transpose()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT * FROM borrowings WHERE book_id = ? AND return_secs IS NULL";
            let row = sqlx::query(query_str)
                .bind(book_id.as_i64())
                .fetch_optional(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.map(Borrowing::try_from).transpose()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Finds the active borrowing of `book_id` by `member_id`, if any.
pub(crate) async fn find_active_borrowing(
    ex: &mut Executor,
    book_id: BookId,
    member_id: MemberId,
) -> DbResult<Option<Borrowing>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT * FROM borrowings
                WHERE book_id = $1 AND member_id = $2 AND return_date IS NULL";
            let row = sqlx::query(query_str)
                .bind(book_id.as_i64())
                .bind(member_id.as_i64())
                .fetch_optional(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.map(Borrowing::try_from).transpose()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT * FROM borrowings
                WHERE book_id = ? AND member_id = ? AND return_secs IS NULL";
            let row = sqlx::query(query_str)
                .bind(book_id.as_i64())
                .bind(member_id.as_i64())
                .fetch_optional(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.map(Borrowing::try_from).transpose()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Marks the borrowing with identifier `id` as returned at `return_date`.
///
/// Only touches the row if it is still active, so a double return surfaces as `NotFound`.
pub(crate) async fn set_returned(
    ex: &mut Executor,
    id: BorrowingId,
    return_date: OffsetDateTime,
) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE borrowings SET return_date = $1
                WHERE id = $2 AND return_date IS NULL";
            let done = sqlx::query(query_str)
                .bind(return_date)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (return_secs, return_nsecs) = unpack_timestamp(return_date);

            let query_str = "
                UPDATE borrowings SET return_secs = ?, return_nsecs = ?
                WHERE id = ? AND return_secs IS NULL";
            let done = sqlx::query(query_str)
                .bind(return_secs)
                .bind(return_nsecs)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Update affected more than one row".to_owned())),
    }
}

/// Lists every borrowing, active or not, made by `member_id`, oldest first.
pub(crate) async fn list_borrowings_by_member(
    ex: &mut Executor,
    member_id: MemberId,
) -> DbResult<Vec<Borrowing>> {
    let rows = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM borrowings WHERE member_id = $1 ORDER BY id";
            let rows = sqlx::query(query_str)
                .bind(member_id.as_i64())
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter().map(Borrowing::try_from).collect::<DbResult<Vec<Borrowing>>>()?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM borrowings WHERE member_id = ? ORDER BY id";
            let rows = sqlx::query(query_str)
                .bind(member_id.as_i64())
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter().map(Borrowing::try_from).collect::<DbResult<Vec<Borrowing>>>()?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(rows)
}

/// Lists every currently active borrowing, oldest first.
pub(crate) async fn list_active_borrowings(ex: &mut Executor) -> DbResult<Vec<Borrowing>> {
    let rows = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM borrowings WHERE return_date IS NULL ORDER BY id";
            let rows = sqlx::query(query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter().map(Borrowing::try_from).collect::<DbResult<Vec<Borrowing>>>()?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM borrowings WHERE return_secs IS NULL ORDER BY id";
            let rows = sqlx::query(query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter().map(Borrowing::try_from).collect::<DbResult<Vec<Borrowing>>>()?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(rows)
}

/// Tells whether any borrowing, active or not, references `book_id`.
pub(crate) async fn has_borrowings_for_book(ex: &mut Executor, book_id: BookId) -> DbResult<bool> {
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM borrowings WHERE book_id = $1";
            let row = sqlx::query(query_str)
                .bind(book_id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM borrowings WHERE book_id = ?";
            let row = sqlx::query(query_str)
                .bind(book_id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("count").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(count > 0)
}

/// Tells whether any borrowing, active or not, references `member_id`.
pub(crate) async fn has_borrowings_for_member(
    ex: &mut Executor,
    member_id: MemberId,
) -> DbResult<bool> {
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM borrowings WHERE member_id = $1";
            let row = sqlx::query(query_str)
                .bind(member_id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM borrowings WHERE member_id = ?";
            let row = sqlx::query(query_str)
                .bind(member_id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("count").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(count > 0)
}
