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

//! Extends the driver with the borrowing lifecycle operations.

use crate::db::{self, DbError};
use crate::driver::{commit_error, LibraryDriver};
use crate::errors::{DomainError, DomainResult};
use crate::model::{BookId, Borrowing, BorrowingId, MemberId};

impl LibraryDriver {
    /// Borrows the book `book_id` for the member `member_id` and returns the new active
    /// borrowing.
    ///
    /// The up-front check against an existing active borrowing yields a friendly error that
    /// names the current holder, but it is not what upholds the invariant: if two borrowings
    /// of the same book race past the check, the partial unique index in the database stops
    /// the second insert and the loser gets a bare conflict error.
    pub async fn borrow_book(self, book_id: BookId, member_id: MemberId) -> DomainResult<Borrowing> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "borrow_book", async move {
            let mut tx = self.db.begin().await?;
            let now = self.clock.now_utc();

            let book = match db::get_book(tx.ex(), book_id).await {
                Ok(book) => book,
                Err(DbError::NotFound) => {
                    return Err(DomainError::not_found("Book", book_id.as_i64()))
                }
                Err(e) => return Err(e.into()),
            };
            if let Err(DbError::NotFound) = db::get_member(tx.ex(), member_id).await {
                return Err(DomainError::not_found("Member", member_id.as_i64()));
            }

            if let Some(active) = db::find_active_borrowing_for_book(tx.ex(), book_id).await? {
                return Err(DomainError::conflict(format!(
                    "Book '{}' is already borrowed",
                    book.title
                ))
                .with_detail("book_id", book_id)
                .with_detail("current_holder", active.member_id));
            }

            let id = match db::create_borrowing(tx.ex(), book_id, member_id, now).await {
                Ok(id) => id,
                Err(DbError::AlreadyExists) => {
                    // Lost the race against a concurrent borrowing of the same book.
                    return Err(DomainError::conflict(format!(
                        "Book '{}' is already borrowed",
                        book.title
                    ))
                    .with_detail("book_id", book_id));
                }
                Err(e) => return Err(e.into()),
            };
            tx.commit().await.map_err(commit_error)?;

            Ok(Borrowing { id, book_id, member_id, borrow_date: now, return_date: None })
        })
        .await
    }

    /// Returns the book `book_id` previously borrowed by the member `member_id` and yields
    /// the closed borrowing.
    pub async fn return_book(self, book_id: BookId, member_id: MemberId) -> DomainResult<Borrowing> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "return_book", async move {
            let mut tx = self.db.begin().await?;
            let now = self.clock.now_utc();

            if let Err(DbError::NotFound) = db::get_book(tx.ex(), book_id).await {
                return Err(DomainError::not_found("Book", book_id.as_i64()));
            }
            if let Err(DbError::NotFound) = db::get_member(tx.ex(), member_id).await {
                return Err(DomainError::not_found("Member", member_id.as_i64()));
            }

            let borrowing = match db::find_active_borrowing(tx.ex(), book_id, member_id).await? {
                Some(borrowing) => borrowing,
                None => {
                    return Err(DomainError::operation_not_allowed(
                        "return_book",
                        "this member has no active borrowing of this book",
                    ));
                }
            };

            match db::set_returned(tx.ex(), borrowing.id, now).await {
                Ok(()) => (),
                Err(DbError::NotFound) => {
                    return Err(DomainError::operation_not_allowed(
                        "return_book",
                        "the borrowing has already been returned",
                    ));
                }
                Err(e) => return Err(e.into()),
            }
            tx.commit().await.map_err(commit_error)?;

            Ok(Borrowing { return_date: Some(now), ..borrowing })
        })
        .await
    }

    /// Gets the borrowing with identifier `id`.
    pub async fn get_borrowing(self, id: BorrowingId) -> DomainResult<Borrowing> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "get_borrowing", async move {
            let mut ex = self.db.ex().await?;
            match db::get_borrowing(&mut ex, id).await {
                Ok(borrowing) => Ok(borrowing),
                Err(DbError::NotFound) => Err(DomainError::not_found("Borrowing", id.as_i64())),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Lists the full borrowing history, active and returned, of the member `member_id`.
    ///
    /// A member with no borrowings yields an empty list, even if the member does not exist
    /// at all; history queries do not distinguish the two cases.
    pub async fn get_member_borrowings(self, member_id: MemberId) -> DomainResult<Vec<Borrowing>> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "get_member_borrowings", async move {
            let mut ex = self.db.ex().await?;
            Ok(db::list_borrowings_by_member(&mut ex, member_id).await?)
        })
        .await
    }

    /// Lists every currently active borrowing.
    pub async fn get_active_borrowings(self) -> DomainResult<Vec<Borrowing>> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "get_active_borrowings", async move {
            let mut ex = self.db.ex().await?;
            Ok(db::list_active_borrowings(&mut ex).await?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocks::Clock;
    use crate::driver::testutils::*;
    use crate::errors::ErrorKind;
    use std::time::Duration;

    #[tokio::test]
    async fn test_borrow_book_ok() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("The Title").await;
        let member = context.create_simple_member("jane").await;

        let borrowing = context.driver().borrow_book(book.id, member.id).await.unwrap();
        assert_eq!(book.id, borrowing.book_id);
        assert_eq!(member.id, borrowing.member_id);
        assert_eq!(context.clock.now_utc(), borrowing.borrow_date);
        assert_eq!(None, borrowing.return_date);

        assert_eq!(borrowing, context.driver().get_borrowing(borrowing.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_borrow_book_missing_entities() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("The Title").await;
        let member = context.create_simple_member("jane").await;

        let e = context
            .driver()
            .borrow_book(BookId::new(123).unwrap(), member.id)
            .await
            .unwrap_err();
        assert_eq!(ErrorKind::ResourceNotFound, e.kind);
        assert_eq!("Book", e.details["resource_type"]);

        let e = context
            .driver()
            .borrow_book(book.id, MemberId::new(123).unwrap())
            .await
            .unwrap_err();
        assert_eq!(ErrorKind::ResourceNotFound, e.kind);
        assert_eq!("Member", e.details["resource_type"]);

        // Neither failure may have left a borrowing behind.
        assert!(context.driver().get_active_borrowings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_borrow_book_already_borrowed() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("The Title").await;
        let member1 = context.create_simple_member("jane").await;
        let member2 = context.create_simple_member("john").await;

        context.driver().borrow_book(book.id, member1.id).await.unwrap();

        let e = context.driver().borrow_book(book.id, member2.id).await.unwrap_err();
        assert_eq!(ErrorKind::Conflict, e.kind);
        assert_eq!("Book 'The Title' is already borrowed", e.message);
        assert_eq!(member1.id.to_string(), e.details["current_holder"]);

        // The same member borrowing the same book twice is also a conflict.
        let e = context.driver().borrow_book(book.id, member1.id).await.unwrap_err();
        assert_eq!(ErrorKind::Conflict, e.kind);
    }

    #[tokio::test]
    async fn test_borrow_book_same_member_different_books() {
        let context = TestContext::setup().await;

        let book1 = context.create_simple_book("One").await;
        let book2 = context.create_simple_book("Two").await;
        let member = context.create_simple_member("jane").await;

        context.driver().borrow_book(book1.id, member.id).await.unwrap();
        context.driver().borrow_book(book2.id, member.id).await.unwrap();

        assert_eq!(2, context.driver().get_active_borrowings().await.unwrap().len());
    }

    #[tokio::test]
    async fn test_return_book_ok_and_reborrow() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("The Title").await;
        let member1 = context.create_simple_member("jane").await;
        let member2 = context.create_simple_member("john").await;

        let borrowing = context.driver().borrow_book(book.id, member1.id).await.unwrap();
        context.clock.advance(Duration::from_secs(7 * 24 * 60 * 60));

        let returned = context.driver().return_book(book.id, member1.id).await.unwrap();
        assert_eq!(borrowing.id, returned.id);
        assert_eq!(borrowing.borrow_date, returned.borrow_date);
        assert_eq!(Some(context.clock.now_utc()), returned.return_date);
        assert!(returned.is_returned());

        // The book is available again.
        context.driver().borrow_book(book.id, member2.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_return_book_missing_entities() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("The Title").await;
        let member = context.create_simple_member("jane").await;

        let e = context
            .driver()
            .return_book(BookId::new(123).unwrap(), member.id)
            .await
            .unwrap_err();
        assert_eq!(ErrorKind::ResourceNotFound, e.kind);

        let e = context
            .driver()
            .return_book(book.id, MemberId::new(123).unwrap())
            .await
            .unwrap_err();
        assert_eq!(ErrorKind::ResourceNotFound, e.kind);
    }

    #[tokio::test]
    async fn test_return_book_not_borrowed() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("The Title").await;
        let member = context.create_simple_member("jane").await;

        let e = context.driver().return_book(book.id, member.id).await.unwrap_err();
        assert_eq!(ErrorKind::OperationNotAllowed, e.kind);
        assert_eq!("return_book", e.details["operation"]);
    }

    #[tokio::test]
    async fn test_return_book_wrong_member() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("The Title").await;
        let member1 = context.create_simple_member("jane").await;
        let member2 = context.create_simple_member("john").await;

        context.driver().borrow_book(book.id, member1.id).await.unwrap();

        let e = context.driver().return_book(book.id, member2.id).await.unwrap_err();
        assert_eq!(ErrorKind::OperationNotAllowed, e.kind);
    }

    #[tokio::test]
    async fn test_return_book_twice() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("The Title").await;
        let member = context.create_simple_member("jane").await;

        context.driver().borrow_book(book.id, member.id).await.unwrap();
        context.driver().return_book(book.id, member.id).await.unwrap();

        let e = context.driver().return_book(book.id, member.id).await.unwrap_err();
        assert_eq!(ErrorKind::OperationNotAllowed, e.kind);
    }

    #[tokio::test]
    async fn test_get_borrowing_not_found() {
        let context = TestContext::setup().await;

        let e = context.driver().get_borrowing(BorrowingId::new(123).unwrap()).await.unwrap_err();
        assert_eq!(ErrorKind::ResourceNotFound, e.kind);
        assert_eq!("Borrowing with ID 123 not found", e.message);
    }

    #[tokio::test]
    async fn test_get_member_borrowings_full_history() {
        let context = TestContext::setup().await;

        let book1 = context.create_simple_book("One").await;
        let book2 = context.create_simple_book("Two").await;
        let member = context.create_simple_member("jane").await;

        let b1 = context.driver().borrow_book(book1.id, member.id).await.unwrap();
        context.clock.advance(Duration::from_secs(60));
        context.driver().return_book(book1.id, member.id).await.unwrap();
        let b2 = context.driver().borrow_book(book2.id, member.id).await.unwrap();

        let history = context.driver().get_member_borrowings(member.id).await.unwrap();
        assert_eq!(2, history.len());
        assert_eq!(b1.id, history[0].id);
        assert!(history[0].is_returned());
        assert_eq!(b2.id, history[1].id);
        assert!(!history[1].is_returned());
    }

    #[tokio::test]
    async fn test_get_member_borrowings_unknown_member_is_empty() {
        let context = TestContext::setup().await;

        let history =
            context.driver().get_member_borrowings(MemberId::new(123).unwrap()).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_get_active_borrowings() {
        let context = TestContext::setup().await;

        let book1 = context.create_simple_book("One").await;
        let book2 = context.create_simple_book("Two").await;
        let member = context.create_simple_member("jane").await;

        assert!(context.driver().get_active_borrowings().await.unwrap().is_empty());

        let b1 = context.driver().borrow_book(book1.id, member.id).await.unwrap();
        let b2 = context.driver().borrow_book(book2.id, member.id).await.unwrap();
        context.driver().return_book(book1.id, member.id).await.unwrap();

        let active = context.driver().get_active_borrowings().await.unwrap();
        assert_eq!(1, active.len());
        assert_eq!(b2.id, active[0].id);
        assert_ne!(b1.id, active[0].id);
    }

    #[tokio::test]
    async fn test_concurrent_borrows_only_one_wins() {
        let context = TestContext::setup().await;

        let book = context.create_simple_book("The Title").await;
        let member1 = context.create_simple_member("jane").await;
        let member2 = context.create_simple_member("john").await;

        let (r1, r2) = tokio::join!(
            context.driver().borrow_book(book.id, member1.id),
            context.driver().borrow_book(book.id, member2.id),
        );

        // No interleaving may ever grant the book to both members.
        assert!(
            !(r1.is_ok() && r2.is_ok()),
            "Both concurrent borrowings succeeded: {:?} / {:?}",
            r1,
            r2
        );
        assert!(context.driver().get_active_borrowings().await.unwrap().len() <= 1);
    }
}
