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

//! Entry point to the gRPC server.
//!
//! This is a thin translator between the generated wire types and the driver,
//! mirroring the REST adapter.  The one wire-level convention to be aware of
//! is that absent optional strings travel as `""`, both ways: an empty `isbn`
//! or `phone` in a request means "absent" (and therefore cannot clear the
//! field on update), and an empty `return_date` in a response means the
//! borrowing is still active.

use crate::driver::{BookPatch, LibraryDriver, MemberPatch};
use crate::errors::DomainError;
use crate::model::{self, BookId, MemberId};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tonic::{Request, Response, Status};

/// Wire types and service glue generated from `proto/library.proto`.
pub mod proto {
    #![allow(missing_docs, clippy::missing_docs_in_private_items)]

    tonic::include_proto!("library.v1");
}

use proto::library_service_server::LibraryService;

/// Formats a timestamp for the wire.
fn format_timestamp(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).expect("UTC timestamps are always representable in RFC 3339")
}

/// Maps an empty string from the wire to an absent value.
fn optional_string(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl From<DomainError> for Status {
    fn from(e: DomainError) -> Self {
        let code = e.kind.grpc_code();
        let mut parts = vec![e.message];
        if let Some(field) = e.field {
            parts.push(format!("field: {}", field));
        }
        for (key, value) in e.details {
            parts.push(format!("{}: {}", key, value));
        }
        Status::new(code, parts.join(" | "))
    }
}

impl From<model::Book> for proto::Book {
    fn from(book: model::Book) -> Self {
        Self {
            id: book.id.as_i64(),
            title: book.title,
            author: book.author,
            isbn: book.isbn.map(|isbn| isbn.as_str().to_owned()).unwrap_or_default(),
            created_at: format_timestamp(book.created_at),
            updated_at: format_timestamp(book.updated_at),
        }
    }
}

impl From<model::Member> for proto::Member {
    fn from(member: model::Member) -> Self {
        Self {
            id: member.id.as_i64(),
            name: member.name,
            email: member.email.as_str().to_owned(),
            phone: member.phone.map(|phone| phone.as_str().to_owned()).unwrap_or_default(),
            created_at: format_timestamp(member.created_at),
            updated_at: format_timestamp(member.updated_at),
        }
    }
}

impl From<model::Borrowing> for proto::Borrowing {
    fn from(borrowing: model::Borrowing) -> Self {
        let is_returned = borrowing.is_returned();
        Self {
            id: borrowing.id.as_i64(),
            book_id: borrowing.book_id.as_i64(),
            member_id: borrowing.member_id.as_i64(),
            borrow_date: format_timestamp(borrowing.borrow_date),
            return_date: borrowing.return_date.map(format_timestamp).unwrap_or_default(),
            is_returned,
        }
    }
}

/// Implementation of the gRPC service.
pub struct LibraryServiceImpl {
    /// The driver that every RPC delegates to.
    driver: LibraryDriver,
}

impl LibraryServiceImpl {
    /// Creates a new service backed by `driver`.
    pub fn new(driver: LibraryDriver) -> Self {
        Self { driver }
    }

    /// Validates a raw book identifier from the wire.
    fn book_id(id: i64) -> Result<BookId, Status> {
        BookId::new(id).map_err(|e| Status::from(DomainError::from(e)))
    }

    /// Validates a raw member identifier from the wire.
    fn member_id(id: i64) -> Result<MemberId, Status> {
        MemberId::new(id).map_err(|e| Status::from(DomainError::from(e)))
    }
}

#[tonic::async_trait]
impl LibraryService for LibraryServiceImpl {
    async fn create_book(
        &self,
        request: Request<proto::CreateBookRequest>,
    ) -> Result<Response<proto::BookId>, Status> {
        let request = request.into_inner();
        let book = self
            .driver
            .clone()
            .create_book(request.title, request.author, optional_string(request.isbn))
            .await?;
        Ok(Response::new(proto::BookId { id: book.id.as_i64() }))
    }

    async fn update_book(
        &self,
        request: Request<proto::UpdateBookRequest>,
    ) -> Result<Response<proto::Book>, Status> {
        let request = request.into_inner();
        let id = Self::book_id(request.id)?;
        let patch = BookPatch {
            title: optional_string(request.title),
            author: optional_string(request.author),
            isbn: optional_string(request.isbn),
        };
        let book = self.driver.clone().update_book(id, patch).await?;
        Ok(Response::new(book.into()))
    }

    async fn get_book(
        &self,
        request: Request<proto::BookId>,
    ) -> Result<Response<proto::Book>, Status> {
        let id = Self::book_id(request.into_inner().id)?;
        let book = self.driver.clone().get_book(id).await?;
        Ok(Response::new(book.into()))
    }

    async fn list_books(
        &self,
        _request: Request<proto::Empty>,
    ) -> Result<Response<proto::BookList>, Status> {
        let books = self.driver.clone().list_books().await?;
        Ok(Response::new(proto::BookList { books: books.into_iter().map(Into::into).collect() }))
    }

    async fn create_member(
        &self,
        request: Request<proto::CreateMemberRequest>,
    ) -> Result<Response<proto::MemberId>, Status> {
        let request = request.into_inner();
        let member = self
            .driver
            .clone()
            .create_member(request.name, request.email, optional_string(request.phone))
            .await?;
        Ok(Response::new(proto::MemberId { id: member.id.as_i64() }))
    }

    async fn update_member(
        &self,
        request: Request<proto::UpdateMemberRequest>,
    ) -> Result<Response<proto::Member>, Status> {
        let request = request.into_inner();
        let id = Self::member_id(request.id)?;
        let patch = MemberPatch {
            name: optional_string(request.name),
            email: optional_string(request.email),
            phone: optional_string(request.phone),
        };
        let member = self.driver.clone().update_member(id, patch).await?;
        Ok(Response::new(member.into()))
    }

    async fn get_member(
        &self,
        request: Request<proto::MemberId>,
    ) -> Result<Response<proto::Member>, Status> {
        let id = Self::member_id(request.into_inner().id)?;
        let member = self.driver.clone().get_member(id).await?;
        Ok(Response::new(member.into()))
    }

    async fn list_members(
        &self,
        _request: Request<proto::Empty>,
    ) -> Result<Response<proto::MemberList>, Status> {
        let members = self.driver.clone().list_members().await?;
        Ok(Response::new(proto::MemberList {
            members: members.into_iter().map(Into::into).collect(),
        }))
    }

    async fn borrow_book(
        &self,
        request: Request<proto::BorrowRequest>,
    ) -> Result<Response<proto::Borrowing>, Status> {
        let request = request.into_inner();
        let book_id = Self::book_id(request.book_id)?;
        let member_id = Self::member_id(request.member_id)?;
        let borrowing = self.driver.clone().borrow_book(book_id, member_id).await?;
        Ok(Response::new(borrowing.into()))
    }

    async fn return_book(
        &self,
        request: Request<proto::ReturnRequest>,
    ) -> Result<Response<proto::Borrowing>, Status> {
        let request = request.into_inner();
        let book_id = Self::book_id(request.book_id)?;
        let member_id = Self::member_id(request.member_id)?;
        let borrowing = self.driver.clone().return_book(book_id, member_id).await?;
        Ok(Response::new(borrowing.into()))
    }

    async fn get_member_borrowings(
        &self,
        request: Request<proto::MemberId>,
    ) -> Result<Response<proto::BorrowingList>, Status> {
        let id = Self::member_id(request.into_inner().id)?;
        let borrowings = self.driver.clone().get_member_borrowings(id).await?;
        Ok(Response::new(proto::BorrowingList {
            borrowings: borrowings.into_iter().map(Into::into).collect(),
        }))
    }
}
