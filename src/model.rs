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

//! High-level data types for the library domain.
//!
//! All field validation lives in this layer: a value of one of these types is
//! valid by construction, so the driver and the transports never re-validate
//! anything.  Extensive use of the newtype pattern.

use crate::errors::ErrorKind;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

mod emailaddress;
mod ids;
mod isbn;
mod phone;

pub use emailaddress::EmailAddress;
pub use ids::{BookId, BorrowingId, MemberId};
pub use isbn::Isbn;
pub use phone::Phone;

/// Maximum length of free-form text fields (titles, authors, names) per the schema.
pub(crate) const MAX_STRING_LENGTH: usize = 255;

/// A validation failure for a single field of a model type.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ModelError {
    /// The taxonomy kind describing the nature of the failure.
    pub kind: ErrorKind,

    /// Name of the field that failed validation.
    pub field: String,

    /// Human-readable description of the failure.
    pub message: String,

    /// The rejected input, when safe to echo back.
    pub value: Option<String>,
}

/// Result type for model validation.
pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    /// Creates a `required_field_missing` error for `field`.
    pub(crate) fn required(field: &str) -> Self {
        Self {
            kind: ErrorKind::RequiredFieldMissing,
            field: field.to_owned(),
            message: format!("{} is required", field),
            value: None,
        }
    }

    /// Creates an `invalid_format` error for `field` with the rejected `value`.
    pub(crate) fn invalid_format(field: &str, message: String, value: &str) -> Self {
        Self {
            kind: ErrorKind::InvalidFormat,
            field: field.to_owned(),
            message,
            value: Some(value.to_owned()),
        }
    }

    /// Creates an `invalid_length` error for `field`.
    pub(crate) fn invalid_length(field: &str, message: String) -> Self {
        Self { kind: ErrorKind::InvalidLength, field: field.to_owned(), message, value: None }
    }

    /// Creates an `invalid_value` error for `field` with the rejected `value`.
    pub(crate) fn invalid_value(field: &str, message: String, value: String) -> Self {
        Self {
            kind: ErrorKind::InvalidValue,
            field: field.to_owned(),
            message,
            value: Some(value),
        }
    }
}

/// Validates a mandatory free-form string field named `field`: must be
/// non-blank and at most `MAX_STRING_LENGTH` characters once trimmed.
/// Returns the trimmed value.
pub fn required_string(field: &str, value: &str) -> ModelResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ModelError::required(field));
    }
    if trimmed.chars().count() > MAX_STRING_LENGTH {
        return Err(ModelError::invalid_length(
            field,
            format!("{} must be at most {} characters", field, MAX_STRING_LENGTH),
        ));
    }
    Ok(trimmed.to_owned())
}

/// A book in the catalog.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Book {
    /// Identifier of the book.
    pub id: BookId,

    /// Title of the book.
    pub title: String,

    /// Author of the book.
    pub author: String,

    /// ISBN of the book, if known.
    pub isbn: Option<Isbn>,

    /// Time at which the book was registered.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Time of the last modification to the book's details.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A registered member of the library.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Member {
    /// Identifier of the member.
    pub id: MemberId,

    /// Full name of the member.
    pub name: String,

    /// Contact email address of the member.  Unique across members.
    pub email: EmailAddress,

    /// Contact phone number of the member, if provided.
    pub phone: Option<Phone>,

    /// Time at which the member was registered.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Time of the last modification to the member's details.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A borrowing of one book by one member.
///
/// The borrowing is active while `return_date` is `None`.  At most one active
/// borrowing can exist per book at any time; the database schema enforces
/// this with a partial unique index.
#[derive(Clone, Debug, PartialEq)]
pub struct Borrowing {
    /// Identifier of the borrowing.
    pub id: BorrowingId,

    /// The book that was borrowed.
    pub book_id: BookId,

    /// The member that borrowed the book.
    pub member_id: MemberId,

    /// Time at which the book was borrowed.
    pub borrow_date: OffsetDateTime,

    /// Time at which the book was returned, if it has been.
    pub return_date: Option<OffsetDateTime>,
}

impl Borrowing {
    /// Tells whether the book has been returned.
    pub fn is_returned(&self) -> bool {
        self.return_date.is_some()
    }
}

// Hand-written serialization because the wire format carries the derived
// `is_returned` field alongside the stored ones.
impl Serialize for Borrowing {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("Borrowing", 6)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("book_id", &self.book_id)?;
        s.serialize_field("member_id", &self.member_id)?;
        let borrow_date =
            self.borrow_date.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        s.serialize_field("borrow_date", &borrow_date)?;
        let return_date = match &self.return_date {
            Some(date) => Some(date.format(&Rfc3339).map_err(serde::ser::Error::custom)?),
            None => None,
        };
        s.serialize_field("return_date", &return_date)?;
        s.serialize_field("is_returned", &self.is_returned())?;
        s.end()
    }
}
