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

//! The `Isbn` data type.

use crate::model::{ModelError, ModelResult};
use serde::de::Visitor;
use serde::{Deserialize, Serialize};

/// A checksum-verified ISBN in normalized form.
///
/// Both ISBN-10 and ISBN-13 are accepted.  Hyphens and spaces in the input
/// are ignored and not retained: two renditions of the same ISBN compare
/// equal and persist identically.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Isbn(String);

impl Isbn {
    /// Creates a new ISBN from an untrusted string `s`, verifying its check digit.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let raw = s.into();

        let cleaned: String =
            raw.chars().filter(|ch| *ch != '-' && !ch.is_whitespace()).collect();

        let valid = match cleaned.len() {
            10 => checksum_isbn10(&cleaned),
            13 => checksum_isbn13(&cleaned),
            _ => {
                return Err(ModelError::invalid_format(
                    "isbn",
                    "ISBN must have 10 or 13 digits".to_owned(),
                    &raw,
                ))
            }
        };
        if !valid {
            return Err(ModelError::invalid_format(
                "isbn",
                format!("'{}' is not a valid ISBN", raw),
                &raw,
            ));
        }

        Ok(Self(cleaned))
    }

    /// Returns a string view of the normalized ISBN.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Verifies the modulus-11 check digit of a 10-character candidate `s`.
fn checksum_isbn10(s: &str) -> bool {
    let mut sum = 0u32;
    for (i, ch) in s.chars().enumerate() {
        let value = match ch {
            '0'..='9' => ch as u32 - '0' as u32,
            'X' | 'x' if i == 9 => 10,
            _ => return false,
        };
        sum += (10 - i as u32) * value;
    }
    sum % 11 == 0
}

/// Verifies the alternating-weight modulus-10 check digit of a 13-character
/// candidate `s`.
fn checksum_isbn13(s: &str) -> bool {
    let mut sum = 0u32;
    for (i, ch) in s.chars().enumerate() {
        let value = match ch {
            '0'..='9' => ch as u32 - '0' as u32,
            _ => return false,
        };
        sum += if i % 2 == 0 { value } else { 3 * value };
    }
    sum % 10 == 0
}

/// Visitor to deserialize an `Isbn` from a string.
struct IsbnVisitor;

impl Visitor<'_> for IsbnVisitor {
    type Value = Isbn;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("an ISBN-10 or ISBN-13")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Isbn::new(v).map_err(|e| E::custom(format!("{}", e)))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Isbn::new(v).map_err(|e| E::custom(format!("{}", e)))
    }
}

impl<'de> Deserialize<'de> for Isbn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_string(IsbnVisitor)
    }
}
