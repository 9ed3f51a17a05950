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

//! Extends the driver with the book catalog operations.

use crate::db::{self, DbError};
use crate::driver::{commit_error, LibraryDriver};
use crate::errors::{DomainError, DomainResult};
use crate::model::{required_string, Book, BookId, Isbn};
use serde::Deserialize;

/// Partial update to a book.  Absent fields keep their current value; an explicitly empty
/// `isbn` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct BookPatch {
    /// New title for the book, if given.
    pub title: Option<String>,

    /// New author for the book, if given.
    pub author: Option<String>,

    /// New ISBN for the book, if given.
    pub isbn: Option<String>,
}

/// Validates an optional ISBN as it arrives from a caller.  Blank values mean "no ISBN".
fn optional_isbn(isbn: Option<&str>) -> DomainResult<Option<Isbn>> {
    match isbn {
        Some(s) if !s.trim().is_empty() => Ok(Some(Isbn::new(s)?)),
        _ => Ok(None),
    }
}

impl LibraryDriver {
    /// Registers a new book with the given details and returns it.
    pub async fn create_book(
        self,
        title: String,
        author: String,
        isbn: Option<String>,
    ) -> DomainResult<Book> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "create_book", async move {
            let title = required_string("title", &title)?;
            let author = required_string("author", &author)?;
            let isbn = optional_isbn(isbn.as_deref())?;

            let mut tx = self.db.begin().await?;
            let now = self.clock.now_utc();
            let id = match db::create_book(tx.ex(), &title, &author, isbn.as_ref(), now).await {
                Ok(id) => id,
                Err(DbError::AlreadyExists) => {
                    let value = isbn.as_ref().map(Isbn::as_str).unwrap_or_default();
                    return Err(DomainError::already_exists("Book", "isbn", value));
                }
                Err(e) => return Err(e.into()),
            };
            tx.commit().await.map_err(commit_error)?;

            Ok(Book { id, title, author, isbn, created_at: now, updated_at: now })
        })
        .await
    }

    /// Gets the book with identifier `id`.
    pub async fn get_book(self, id: BookId) -> DomainResult<Book> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "get_book", async move {
            let mut ex = self.db.ex().await?;
            match db::get_book(&mut ex, id).await {
                Ok(book) => Ok(book),
                Err(DbError::NotFound) => Err(DomainError::not_found("Book", id.as_i64())),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Lists all books in the catalog.
    pub async fn list_books(self) -> DomainResult<Vec<Book>> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "list_books", async move {
            let mut ex = self.db.ex().await?;
            Ok(db::list_books(&mut ex).await?)
        })
        .await
    }

    /// Applies `patch` to the book with identifier `id` and returns the updated book.
    pub async fn update_book(self, id: BookId, patch: BookPatch) -> DomainResult<Book> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "update_book", async move {
            let mut tx = self.db.begin().await?;
            let now = self.clock.now_utc();

            let mut book = match db::get_book(tx.ex(), id).await {
                Ok(book) => book,
                Err(DbError::NotFound) => {
                    return Err(DomainError::not_found("Book", id.as_i64()))
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(title) = patch.title {
                book.title = required_string("title", &title)?;
            }
            if let Some(author) = patch.author {
                book.author = required_string("author", &author)?;
            }
            if let Some(isbn) = patch.isbn {
                book.isbn = optional_isbn(Some(&isbn))?;
            }
            book.updated_at = now;

            match db::update_book(tx.ex(), &book).await {
                Ok(()) => (),
                Err(DbError::AlreadyExists) => {
                    let value = book.isbn.as_ref().map(Isbn::as_str).unwrap_or_default();
                    return Err(DomainError::already_exists("Book", "isbn", value));
                }
                Err(DbError::NotFound) => {
                    return Err(DomainError::not_found("Book", id.as_i64()))
                }
                Err(e) => return Err(e.into()),
            }
            tx.commit().await.map_err(commit_error)?;

            Ok(book)
        })
        .await
    }

    /// Removes the book with identifier `id` from the catalog.
    ///
    /// Books that appear in the borrowing records, even if only in returned borrowings, cannot
    /// be deleted because doing so would erase history.
    pub async fn delete_book(self, id: BookId) -> DomainResult<()> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "delete_book", async move {
            let mut tx = self.db.begin().await?;

            if db::has_borrowings_for_book(tx.ex(), id).await? {
                return Err(DomainError::operation_not_allowed(
                    "delete_book",
                    "the book has borrowing records",
                ));
            }

            match db::delete_book(tx.ex(), id).await {
                Ok(()) => (),
                Err(DbError::NotFound) => {
                    return Err(DomainError::not_found("Book", id.as_i64()))
                }
                Err(e) => return Err(e.into()),
            }
            tx.commit().await.map_err(commit_error)?;

            Ok(())
        })
        .await
    }
}
