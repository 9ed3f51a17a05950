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

//! Extends the driver with the member registry operations.

use crate::db::{self, DbError};
use crate::driver::{commit_error, LibraryDriver};
use crate::errors::{DomainError, DomainResult};
use crate::model::{required_string, EmailAddress, Member, MemberId, Phone};
use serde::Deserialize;

/// Partial update to a member.  Absent fields keep their current value; an explicitly empty
/// `phone` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct MemberPatch {
    /// New name for the member, if given.
    pub name: Option<String>,

    /// New email address for the member, if given.
    pub email: Option<String>,

    /// New phone number for the member, if given.
    pub phone: Option<String>,
}

/// Validates an optional phone number as it arrives from a caller.  Blank values mean "no
/// phone number".
fn optional_phone(phone: Option<&str>) -> DomainResult<Option<Phone>> {
    match phone {
        Some(s) if !s.trim().is_empty() => Ok(Some(Phone::new(s)?)),
        _ => Ok(None),
    }
}

impl LibraryDriver {
    /// Registers a new member with the given details and returns it.
    pub async fn create_member(
        self,
        name: String,
        email: String,
        phone: Option<String>,
    ) -> DomainResult<Member> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "create_member", async move {
            let name = required_string("name", &name)?;
            let email = EmailAddress::new(email)?;
            let phone = optional_phone(phone.as_deref())?;

            let mut tx = self.db.begin().await?;
            let now = self.clock.now_utc();
            let id =
                match db::create_member(tx.ex(), &name, &email, phone.as_ref(), now).await {
                    Ok(id) => id,
                    Err(DbError::AlreadyExists) => {
                        return Err(DomainError::already_exists(
                            "Member",
                            "email",
                            email.as_str(),
                        ));
                    }
                    Err(e) => return Err(e.into()),
                };
            tx.commit().await.map_err(commit_error)?;

            Ok(Member { id, name, email, phone, created_at: now, updated_at: now })
        })
        .await
    }

    /// Gets the member with identifier `id`.
    pub async fn get_member(self, id: MemberId) -> DomainResult<Member> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "get_member", async move {
            let mut ex = self.db.ex().await?;
            match db::get_member(&mut ex, id).await {
                Ok(member) => Ok(member),
                Err(DbError::NotFound) => Err(DomainError::not_found("Member", id.as_i64())),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Lists all registered members.
    pub async fn list_members(self) -> DomainResult<Vec<Member>> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "list_members", async move {
            let mut ex = self.db.ex().await?;
            Ok(db::list_members(&mut ex).await?)
        })
        .await
    }

    /// Applies `patch` to the member with identifier `id` and returns the updated member.
    pub async fn update_member(self, id: MemberId, patch: MemberPatch) -> DomainResult<Member> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "update_member", async move {
            let mut tx = self.db.begin().await?;
            let now = self.clock.now_utc();

            let mut member = match db::get_member(tx.ex(), id).await {
                Ok(member) => member,
                Err(DbError::NotFound) => {
                    return Err(DomainError::not_found("Member", id.as_i64()))
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(name) = patch.name {
                member.name = required_string("name", &name)?;
            }
            if let Some(email) = patch.email {
                member.email = EmailAddress::new(email)?;
            }
            if let Some(phone) = patch.phone {
                member.phone = optional_phone(Some(&phone))?;
            }
            member.updated_at = now;

            match db::update_member(tx.ex(), &member).await {
                Ok(()) => (),
                Err(DbError::AlreadyExists) => {
                    return Err(DomainError::already_exists(
                        "Member",
                        "email",
                        member.email.as_str(),
                    ));
                }
                Err(DbError::NotFound) => {
                    return Err(DomainError::not_found("Member", id.as_i64()))
                }
                Err(e) => return Err(e.into()),
            }
            tx.commit().await.map_err(commit_error)?;

            Ok(member)
        })
        .await
    }

    /// Removes the member with identifier `id` from the registry.
    ///
    /// Members that appear in the borrowing records, even if only in returned borrowings,
    /// cannot be deleted because doing so would erase history.
    pub async fn delete_member(self, id: MemberId) -> DomainResult<()> {
        let timeout = self.opts.request_timeout;
        Self::run(timeout, "delete_member", async move {
            let mut tx = self.db.begin().await?;

            if db::has_borrowings_for_member(tx.ex(), id).await? {
                return Err(DomainError::operation_not_allowed(
                    "delete_member",
                    "the member has borrowing records",
                ));
            }

            match db::delete_member(tx.ex(), id).await {
                Ok(()) => (),
                Err(DbError::NotFound) => {
                    return Err(DomainError::not_found("Member", id.as_i64()))
                }
                Err(e) => return Err(e.into()),
            }
            tx.commit().await.map_err(commit_error)?;

            Ok(())
        })
        .await
    }
}
