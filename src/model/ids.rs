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

//! Identifier types for the persisted entities.

use crate::model::{ModelError, ModelResult};
use serde::de::Visitor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Generates a newtype over an entity identifier.
///
/// Identifiers are strictly positive integers assigned by the database.  The
/// deserializer only accepts integer tokens, so a JSON `"42"` string is
/// rejected even though it could be parsed.
macro_rules! id_newtype [
    ( $name:ident, $field:expr, $visitor:ident ) => {
        /// Identifier of one entity, valid by construction.
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates a new identifier from the raw `id`, which must be strictly positive.
            pub fn new(id: i64) -> ModelResult<Self> {
                if id <= 0 {
                    return Err(ModelError::invalid_value(
                        $field,
                        format!("{} must be a positive integer", $field),
                        id.to_string(),
                    ));
                }
                Ok(Self(id))
            }

            /// Returns the raw value of the identifier.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        /// Visitor to deserialize the identifier from an integer.
        struct $visitor;

        impl Visitor<'_> for $visitor {
            type Value = $name;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a positive integer")
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                $name::new(v).map_err(|e| E::custom(format!("{}", e)))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match i64::try_from(v) {
                    Ok(v) => $name::new(v).map_err(|e| E::custom(format!("{}", e))),
                    Err(_) => {
                        Err(E::custom(format!("{} must be a positive integer", $field)))
                    }
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                deserializer.deserialize_i64($visitor)
            }
        }
    }
];

id_newtype!(BookId, "book_id", BookIdVisitor);
id_newtype!(MemberId, "member_id", MemberIdVisitor);
id_newtype!(BorrowingId, "borrowing_id", BorrowingIdVisitor);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use serde_test::{assert_de_tokens_error, assert_tokens, Token};

    #[test]
    fn test_id_ok() {
        assert_eq!(1, BookId::new(1).unwrap().as_i64());
        assert_eq!(i64::MAX, MemberId::new(i64::MAX).unwrap().as_i64());
    }

    #[test]
    fn test_id_not_positive() {
        for id in [0, -1, i64::MIN] {
            let e = BookId::new(id).unwrap_err();
            assert_eq!(ErrorKind::InvalidValue, e.kind);
            assert_eq!("book_id", e.field);
            assert_eq!(Some(id.to_string()), e.value);
        }

        assert_eq!("member_id", MemberId::new(0).unwrap_err().field);
        assert_eq!("borrowing_id", BorrowingId::new(0).unwrap_err().field);
    }

    #[test]
    fn test_id_display() {
        assert_eq!("42", format!("{}", BookId::new(42).unwrap()));
    }

    #[test]
    fn test_id_ser_de_ok() {
        let id = BookId::new(42).unwrap();
        assert_tokens(&id, &[Token::I64(42)]);
    }

    #[test]
    fn test_id_de_not_positive() {
        assert_de_tokens_error::<BookId>(
            &[Token::I64(0)],
            "book_id must be a positive integer",
        );
    }

    #[test]
    fn test_id_de_rejects_strings() {
        assert_de_tokens_error::<BookId>(
            &[Token::Str("42")],
            "invalid type: string \"42\", expected a positive integer",
        );
    }

    #[test]
    fn test_id_de_rejects_huge_u64() {
        assert_de_tokens_error::<BookId>(
            &[Token::U64(u64::MAX)],
            "book_id must be a positive integer",
        );
    }
}
