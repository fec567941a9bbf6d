// Bugtrack
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Repository interfaces for users and bugs
//!
//! Lookups return `Ok(None)` when the record is absent; `Err(StoreError)` is
//! reserved for transport or backend failures. Writes against a missing id
//! also report absence through the return value rather than an error.

pub mod memory;

pub use memory::*;

use crate::error::StoreError;
use crate::models::{Bug, BugStatus, NewBug, NewUser, Role, User};
use async_trait::async_trait;

/// User storage trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user. Fails with [`StoreError::Conflict`] if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Get user by email (exact match)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Get user by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Get all users holding a role
    async fn find_by_role(&self, role: Role) -> Result<Vec<User>, StoreError>;

    /// Replace a user record
    async fn update(&self, user: User) -> Result<Option<User>, StoreError>;
}

/// Bug storage trait
#[async_trait]
pub trait BugRepository: Send + Sync {
    /// Persist a new bug
    async fn create(&self, bug: NewBug) -> Result<Bug, StoreError>;

    /// Get bug by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Bug>, StoreError>;

    /// All bugs, newest first
    async fn find_all(&self) -> Result<Vec<Bug>, StoreError>;

    /// Bugs assigned to a user, newest first
    async fn find_by_assignee(&self, assignee_id: &str) -> Result<Vec<Bug>, StoreError>;

    /// Set the status of a bug
    async fn update_status(&self, id: &str, status: BugStatus) -> Result<Option<Bug>, StoreError>;

    /// Replace a bug record
    async fn update(&self, bug: Bug) -> Result<Option<Bug>, StoreError>;

    /// Delete a bug, returning whether it existed
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}
