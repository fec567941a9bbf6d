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

//! Bug lifecycle management
//!
//! Every mutation is checked against the access policy before it reaches the
//! repository, even when the caller has already checked the role. Reads and
//! writes are separate repository calls; two concurrent updates of the same
//! bug may overwrite each other.

use crate::credentials::CredentialStore;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{Bug, BugResponse, BugStatus, CreateBugRequest, NewBug, Role, UpdateBugRequest, User};
use crate::policy::{self, Action, ListScope};
use crate::projection::Projector;
use crate::store::BugRepository;
use std::sync::Arc;
use tracing::{debug, info};

/// Owns bug creation, status changes, assignment, edits and deletion
pub struct BugService {
    bugs: Arc<dyn BugRepository>,
    credentials: Arc<CredentialStore>,
    projector: Projector,
}

impl BugService {
    pub fn new(bugs: Arc<dyn BugRepository>, credentials: Arc<CredentialStore>) -> Self {
        let projector = Projector::new(credentials.clone());
        Self { bugs, credentials, projector }
    }

    async fn load(&self, id: &str) -> TrackerResult<Bug> {
        self.bugs.find_by_id(id).await?.ok_or_else(|| TrackerError::bug_not_found(id))
    }

    /// Report a new bug. The status always starts open.
    pub async fn create(&self, request: CreateBugRequest, reporter: &User) -> TrackerResult<BugResponse> {
        policy::enforce(reporter, Action::CreateBug, None)?;

        if let Some(status) = request.status.filter(|s| *s != BugStatus::Open) {
            debug!("Ignoring client-supplied status {} on bug creation", status);
        }

        let bug = self
            .bugs
            .create(NewBug {
                title: request.title,
                description: request.description,
                status: BugStatus::Open,
                priority: request.priority,
                reported_by: reporter.id.clone(),
            })
            .await?;

        info!("Bug {} reported by {}", bug.id, reporter.id);
        self.projector.project(&bug).await
    }

    /// Fetch a single bug
    pub async fn get_by_id(&self, id: &str) -> TrackerResult<BugResponse> {
        let bug = self.load(id).await?;
        self.projector.project(&bug).await
    }

    /// Every bug, newest first
    pub async fn list_all(&self) -> TrackerResult<Vec<BugResponse>> {
        let bugs = self.bugs.find_all().await?;
        self.projector.project_all(&bugs).await
    }

    /// Bugs assigned to one developer, newest first
    pub async fn list_for_assignee(&self, developer_id: &str) -> TrackerResult<Vec<BugResponse>> {
        let bugs = self.bugs.find_by_assignee(developer_id).await?;
        self.projector.project_all(&bugs).await
    }

    /// The listing an actor is entitled to see
    pub async fn list_for(&self, actor: &User) -> TrackerResult<Vec<BugResponse>> {
        match policy::list_scope(actor) {
            ListScope::All => self.list_all().await,
            ListScope::AssignedTo(developer_id) => self.list_for_assignee(&developer_id).await,
        }
    }

    /// Change a bug's status. Only the assignee may do this.
    pub async fn update_status(&self, id: &str, status: BugStatus, actor: &User) -> TrackerResult<BugResponse> {
        let bug = self.load(id).await?;
        policy::enforce(actor, Action::UpdateStatus, Some(&bug))?;

        let updated = self.bugs.update_status(id, status).await?.ok_or_else(|| TrackerError::bug_not_found(id))?;

        info!("Bug {} status {} -> {} by {}", id, bug.status, updated.status, actor.id);
        self.projector.project(&updated).await
    }

    /// Assign a bug to a developer
    pub async fn assign(&self, id: &str, developer_id: &str, actor: &User) -> TrackerResult<BugResponse> {
        policy::enforce(actor, Action::AssignBug, None)?;
        let mut bug = self.load(id).await?;

        let developer = self.credentials.find_by_id(developer_id).await?.ok_or_else(|| TrackerError::InvalidAssignee {
            message: format!("user {} does not exist", developer_id),
        })?;
        if developer.role != Role::Developer {
            return Err(TrackerError::InvalidAssignee {
                message: format!("user {} is a {}, not a developer", developer.id, developer.role),
            });
        }

        bug.assigned_to = Some(developer.id.clone());
        let updated = self.bugs.update(bug).await?.ok_or_else(|| TrackerError::bug_not_found(id))?;

        info!("Bug {} assigned to {} by {}", id, developer.id, actor.id);
        self.projector.project(&updated).await
    }

    /// Edit title, description or priority. Absent or empty fields keep
    /// their current value.
    pub async fn update(&self, id: &str, request: UpdateBugRequest, actor: &User) -> TrackerResult<BugResponse> {
        let mut bug = self.load(id).await?;
        policy::enforce(actor, Action::EditBug, Some(&bug))?;

        if let Some(title) = request.title() {
            bug.title = title.to_string();
        }
        if let Some(description) = request.description() {
            bug.description = description.to_string();
        }
        if let Some(priority) = request.priority {
            bug.priority = priority;
        }

        let updated = self.bugs.update(bug).await?.ok_or_else(|| TrackerError::bug_not_found(id))?;

        info!("Bug {} edited by {}", id, actor.id);
        self.projector.project(&updated).await
    }

    /// Delete a bug. Restricted to managers and admins.
    pub async fn delete(&self, id: &str, actor: &User) -> TrackerResult<()> {
        policy::enforce(actor, Action::DeleteBug, None)?;

        if !self.bugs.delete(id).await? {
            return Err(TrackerError::bug_not_found(id));
        }

        info!("Bug {} deleted by {}", id, actor.id);
        Ok(())
    }
}
