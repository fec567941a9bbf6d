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

//! Outbound projection of bugs with user references resolved

use crate::credentials::CredentialStore;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{Bug, BugResponse, UserResponse};
use std::sync::Arc;
use tracing::error;

/// Resolves the user ids stored on a bug into public user representations
#[derive(Clone)]
pub struct Projector {
    credentials: Arc<CredentialStore>,
}

impl Projector {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self { credentials }
    }

    async fn resolve(&self, bug: &Bug, user_id: &str, role: &str) -> TrackerResult<UserResponse> {
        match self.credentials.find_by_id(user_id).await? {
            Some(user) => Ok(user.to_response()),
            None => {
                // A bug pointing at a missing user is corrupt data, not a lookup miss
                error!("Bug {} has dangling {} reference {}", bug.id, role, user_id);
                Err(TrackerError::Internal {
                    message: format!("bug {} references missing {} {}", bug.id, role, user_id),
                })
            }
        }
    }

    /// Project a single bug
    pub async fn project(&self, bug: &Bug) -> TrackerResult<BugResponse> {
        let reported_by = self.resolve(bug, &bug.reported_by, "reporter").await?;
        let assigned_to = match &bug.assigned_to {
            Some(assignee_id) => Some(self.resolve(bug, assignee_id, "assignee").await?),
            None => None,
        };

        Ok(BugResponse {
            id: bug.id.clone(),
            title: bug.title.clone(),
            description: bug.description.clone(),
            status: bug.status,
            priority: bug.priority,
            reported_by,
            assigned_to,
            created_at: bug.created_at,
            updated_at: bug.updated_at,
        })
    }

    /// Project a list of bugs, preserving order
    pub async fn project_all(&self, bugs: &[Bug]) -> TrackerResult<Vec<BugResponse>> {
        let mut responses = Vec::with_capacity(bugs.len());
        for bug in bugs {
            responses.push(self.project(bug).await?);
        }
        Ok(responses)
    }
}
