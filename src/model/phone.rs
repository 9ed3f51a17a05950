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

//! The `Phone` data type.

use crate::model::{ModelError, ModelResult};
use serde::de::Visitor;
use serde::{Deserialize, Serialize};

/// A phone number in normalized form.
///
/// Separator characters (spaces, dashes, parentheses and the like) in the
/// input are discarded.  A leading `+` marks an international number with a
/// country code; local numbers carry digits only.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Creates a new phone number from an untrusted string `s`, normalizing
    /// and validating it.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let raw = s.into();

        let cleaned: String =
            raw.chars().filter(|ch| ch.is_ascii_digit() || *ch == '+').collect();

        if cleaned.chars().skip(1).any(|ch| ch == '+') {
            return Err(ModelError::invalid_format(
                "phone",
                "Phone number may only have a leading '+'".to_owned(),
                &raw,
            ));
        }

        if cleaned.starts_with('+') {
            // 8 to 16 characters including the plus sign, so 7 to 15 digits
            // after the country code marker.
            if cleaned.len() < 8 || cleaned.len() > 16 {
                return Err(ModelError::invalid_length(
                    "phone",
                    "International phone number must have 8 to 16 digits including the country \
                     code"
                        .to_owned(),
                ));
            }
        } else if cleaned.len() < 7 || cleaned.len() > 15 {
            return Err(ModelError::invalid_length(
                "phone",
                "Phone number must have 7 to 15 digits".to_owned(),
            ));
        }

        Ok(Self(cleaned))
    }

    /// Returns a string view of the normalized phone number.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Visitor to deserialize a `Phone` from a string.
struct PhoneVisitor;

impl Visitor<'_> for PhoneVisitor {
    type Value = Phone;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a phone number")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Phone::new(v).map_err(|e| E::custom(format!("{}", e)))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Phone::new(v).map_err(|e| E::custom(format!("{}", e)))
    }
}

impl<'de> Deserialize<'de> for Phone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_string(PhoneVisitor)
    }
}
