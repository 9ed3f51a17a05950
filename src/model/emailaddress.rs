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

//! The `EmailAddress` data type.

use crate::model::{ModelError, ModelResult, MAX_STRING_LENGTH};
use serde::de::Visitor;
use serde::{Deserialize, Serialize};

/// A normalized email address.
///
/// Addresses serve as the uniqueness key for members, so they are lowercased
/// on construction: two spellings of the same address compare equal and
/// collide in the database.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a new email address from an untrusted string `s`, normalizing
    /// and validating it.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let raw = s.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(ModelError::required("email"));
        }
        if trimmed.chars().count() > MAX_STRING_LENGTH {
            return Err(ModelError::invalid_length(
                "email",
                format!("email must be at most {} characters", MAX_STRING_LENGTH),
            ));
        }

        // Fully validating email addresses is futile; check just enough
        // structure to catch obvious typos before the address becomes a
        // uniqueness key.
        let valid = match trimmed.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !domain.contains("..")
                    && !trimmed.contains(char::is_whitespace)
                    && !domain.contains('@')
            }
            None => false,
        };
        if !valid {
            return Err(ModelError::invalid_format(
                "email",
                format!("'{}' is not a valid email address", trimmed),
                trimmed,
            ));
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    /// Returns a string view of the normalized email address.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Visitor to deserialize an `EmailAddress` from a string.
struct EmailAddressVisitor;

impl Visitor<'_> for EmailAddressVisitor {
    type Value = EmailAddress;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("an email address")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        EmailAddress::new(v).map_err(|e| E::custom(format!("{}", e)))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        EmailAddress::new(v).map_err(|e| E::custom(format!("{}", e)))
    }
}

impl<'de> Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_string(EmailAddressVisitor)
    }
}
