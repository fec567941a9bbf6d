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

//! Access control policy for bug operations
//!
//! Rules by action:
//! - create, read: any authenticated user
//! - list: managers and admins see everything, developers only their assignments
//! - update status: only the current assignee, regardless of role
//! - assign, delete: managers and admins
//! - edit: managers, admins, the reporter or the assignee
//!
//! Every function here is pure; callers pass the actor and the loaded bug.

use crate::error::{TrackerError, TrackerResult};
use crate::models::{Bug, User};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Operations guarded by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateBug,
    ListBugs,
    ReadBug,
    UpdateStatus,
    AssignBug,
    EditBug,
    DeleteBug,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateBug => "create bug",
            Action::ListBugs => "list bugs",
            Action::ReadBug => "read bug",
            Action::UpdateStatus => "update bug status",
            Action::AssignBug => "assign bug",
            Action::EditBug => "edit bug",
            Action::DeleteBug => "delete bug",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    fn from_bool(allowed: bool) -> Self {
        if allowed { Decision::Allow } else { Decision::Deny }
    }
}

/// Which bugs a listing may contain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    All,
    AssignedTo(String),
}

fn is_assignee(actor: &User, bug: &Bug) -> bool {
    bug.assigned_to.as_deref() == Some(actor.id.as_str())
}

fn is_reporter(actor: &User, bug: &Bug) -> bool {
    bug.reported_by == actor.id
}

/// Decide whether `actor` may perform `action` on `resource`.
///
/// Resource-scoped rules (status update, edit) deny when no bug is given.
/// For [`Action::ListBugs`] a bug may be passed to ask whether it belongs
/// in the actor's listing.
pub fn authorize(actor: &User, action: Action, resource: Option<&Bug>) -> Decision {
    let allowed = match action {
        Action::CreateBug | Action::ReadBug => true,
        Action::ListBugs => match resource {
            None => true,
            Some(bug) => actor.role.is_elevated() || is_assignee(actor, bug),
        },
        Action::UpdateStatus => resource.is_some_and(|bug| is_assignee(actor, bug)),
        Action::AssignBug | Action::DeleteBug => actor.role.is_elevated(),
        Action::EditBug => resource.is_some_and(|bug| actor.role.is_elevated() || is_reporter(actor, bug) || is_assignee(actor, bug)),
    };

    Decision::from_bool(allowed)
}

/// Like [`authorize`], but a denial becomes [`TrackerError::Unauthorized`]
pub fn enforce(actor: &User, action: Action, resource: Option<&Bug>) -> TrackerResult<()> {
    if authorize(actor, action, resource).is_allowed() {
        return Ok(());
    }

    warn!(
        "Denied {} for user {} ({}) on bug {}",
        action,
        actor.id,
        actor.role,
        resource.map(|bug| bug.id.as_str()).unwrap_or("-")
    );
    Err(TrackerError::Unauthorized { action: action.as_str() })
}

/// Listing scope for an actor
pub fn list_scope(actor: &User) -> ListScope {
    if actor.role.is_elevated() {
        ListScope::All
    } else {
        ListScope::AssignedTo(actor.id.clone())
    }
}
