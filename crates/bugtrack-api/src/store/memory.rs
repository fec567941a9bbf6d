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

//! In-memory repositories backed by `DashMap`
//!
//! Every single-record write happens under the owning shard's lock, which is
//! the same atomicity a document store gives a single-document update.

use crate::error::StoreError;
use crate::models::{Bug, BugStatus, NewBug, NewUser, Role, User};
use crate::store::{BugRepository, UserRepository};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

/// In-memory user store
#[derive(Default)]
pub struct MemoryUserRepository {
    users: DashMap<String, User>,
    email_index: DashMap<String, String>, // email -> user_id
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let id = Uuid::new_v4().to_string();

        // Claim the email first so two concurrent registrations cannot both win
        match self.email_index.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict {
                    message: format!("email already registered: {}", user.email),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(id.clone());
            }
        }

        let now = Utc::now();
        let record = User {
            id: id.clone(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(id, record.clone());

        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user_id = match self.email_index.get(email) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };
        Ok(self.users.get(&user_id).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_by_role(&self, role: Role) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.iter().filter(|entry| entry.value().role == role).map(|entry| entry.value().clone()).collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn update(&self, mut user: User) -> Result<Option<User>, StoreError> {
        let previous_email = match self.users.get(&user.id) {
            Some(entry) => entry.value().email.clone(),
            None => return Ok(None),
        };

        if previous_email != user.email {
            match self.email_index.entry(user.email.clone()) {
                Entry::Occupied(owner) if owner.get() != &user.id => {
                    return Err(StoreError::Conflict {
                        message: format!("email already registered: {}", user.email),
                    });
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(user.id.clone());
                }
            }
            self.email_index.remove(&previous_email);
        }

        user.updated_at = Utc::now();
        self.users.insert(user.id.clone(), user.clone());
        Ok(Some(user))
    }
}

/// In-memory bug store
#[derive(Default)]
pub struct MemoryBugRepository {
    bugs: DashMap<String, Bug>,
}

impl MemoryBugRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored bugs
    pub fn len(&self) -> usize {
        self.bugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bugs.is_empty()
    }
}

fn newest_first(mut bugs: Vec<Bug>) -> Vec<Bug> {
    bugs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    bugs
}

#[async_trait]
impl BugRepository for MemoryBugRepository {
    async fn create(&self, bug: NewBug) -> Result<Bug, StoreError> {
        let now = Utc::now();
        let record = Bug {
            id: Uuid::new_v4().to_string(),
            title: bug.title,
            description: bug.description,
            status: bug.status,
            priority: bug.priority,
            reported_by: bug.reported_by,
            assigned_to: None,
            created_at: now,
            updated_at: now,
        };
        self.bugs.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Bug>, StoreError> {
        Ok(self.bugs.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_all(&self) -> Result<Vec<Bug>, StoreError> {
        Ok(newest_first(self.bugs.iter().map(|entry| entry.value().clone()).collect()))
    }

    async fn find_by_assignee(&self, assignee_id: &str) -> Result<Vec<Bug>, StoreError> {
        let bugs = self
            .bugs
            .iter()
            .filter(|entry| entry.value().assigned_to.as_deref() == Some(assignee_id))
            .map(|entry| entry.value().clone())
            .collect();
        Ok(newest_first(bugs))
    }

    async fn update_status(&self, id: &str, status: BugStatus) -> Result<Option<Bug>, StoreError> {
        let Some(mut entry) = self.bugs.get_mut(id) else {
            return Ok(None);
        };
        let stored = entry.value_mut();
        stored.status = status;
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn update(&self, bug: Bug) -> Result<Option<Bug>, StoreError> {
        let Some(mut entry) = self.bugs.get_mut(&bug.id) else {
            return Ok(None);
        };
        let stored = entry.value_mut();

        // Reporter and creation time are write-once
        let reported_by = std::mem::take(&mut stored.reported_by);
        let created_at = stored.created_at;
        *stored = Bug {
            reported_by,
            created_at,
            updated_at: Utc::now(),
            ..bug
        };
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.bugs.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            name: email.split('@').next().unwrap_or_default().to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role,
        }
    }

    fn new_bug(title: &str, reporter: &str) -> NewBug {
        NewBug {
            title: title.to_string(),
            description: "details".to_string(),
            status: BugStatus::Open,
            priority: Priority::Medium,
            reported_by: reporter.to_string(),
        }
    }

    #[tokio::test]
    async fn test_user_store_operations() {
        let store = MemoryUserRepository::new();

        let created = store.create(new_user("dev@example.com", Role::Developer)).await.unwrap();
        assert!(!created.id.is_empty());

        let by_id = store.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "dev@example.com");

        let by_email = store.find_by_email("dev@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        // Lookups are exact
        assert!(store.find_by_email("DEV@example.com").await.unwrap().is_none());
        assert!(store.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryUserRepository::new();
        store.create(new_user("a@example.com", Role::Manager)).await.unwrap();

        let result = store.create(new_user("a@example.com", Role::Developer)).await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_role() {
        let store = MemoryUserRepository::new();
        store.create(new_user("zed@example.com", Role::Developer)).await.unwrap();
        store.create(new_user("amy@example.com", Role::Developer)).await.unwrap();
        store.create(new_user("boss@example.com", Role::Manager)).await.unwrap();

        let developers = store.find_by_role(Role::Developer).await.unwrap();
        let names: Vec<&str> = developers.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["amy", "zed"]);
        assert!(store.find_by_role(Role::Admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_update_moves_email_index() {
        let store = MemoryUserRepository::new();
        let mut user = store.create(new_user("old@example.com", Role::Developer)).await.unwrap();
        store.create(new_user("taken@example.com", Role::Developer)).await.unwrap();

        user.email = "taken@example.com".to_string();
        assert!(matches!(store.update(user.clone()).await, Err(StoreError::Conflict { .. })));

        user.email = "new@example.com".to_string();
        user.role = Role::Manager;
        let updated = store.update(user.clone()).await.unwrap().unwrap();
        assert_eq!(updated.role, Role::Manager);
        assert!(store.find_by_email("old@example.com").await.unwrap().is_none());
        assert_eq!(store.find_by_email("new@example.com").await.unwrap().unwrap().id, user.id);

        let mut ghost = user.clone();
        ghost.id = "missing".to_string();
        assert!(store.update(ghost).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bug_store_operations() {
        let store = MemoryBugRepository::new();
        let bug = store.create(new_bug("Crash", "reporter")).await.unwrap();
        assert_eq!(bug.assigned_to, None);
        assert_eq!(bug.created_at, bug.updated_at);

        let fetched = store.find_by_id(&bug.id).await.unwrap().unwrap();
        assert_eq!(fetched, bug);

        let updated = store.update_status(&bug.id, BugStatus::Resolved).await.unwrap().unwrap();
        assert_eq!(updated.status, BugStatus::Resolved);
        assert!(updated.updated_at >= bug.updated_at);

        assert!(store.update_status("missing", BugStatus::Open).await.unwrap().is_none());
        assert!(store.delete(&bug.id).await.unwrap());
        assert!(!store.delete(&bug.id).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_bug_update_keeps_reporter() {
        let store = MemoryBugRepository::new();
        let bug = store.create(new_bug("Crash", "reporter")).await.unwrap();

        let mut changed = bug.clone();
        changed.title = "Crash on load".to_string();
        changed.reported_by = "someone-else".to_string();
        changed.assigned_to = Some("dev".to_string());

        let stored = store.update(changed).await.unwrap().unwrap();
        assert_eq!(stored.title, "Crash on load");
        assert_eq!(stored.reported_by, "reporter");
        assert_eq!(stored.assigned_to.as_deref(), Some("dev"));
        assert_eq!(stored.created_at, bug.created_at);
    }

    #[tokio::test]
    async fn test_find_by_assignee() {
        let store = MemoryBugRepository::new();
        let first = store.create(new_bug("First", "r")).await.unwrap();
        store.create(new_bug("Second", "r")).await.unwrap();

        let mut assigned = first.clone();
        assigned.assigned_to = Some("dev".to_string());
        store.update(assigned).await.unwrap();

        let mine = store.find_by_assignee("dev").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, first.id);
        assert_eq!(store.find_all().await.unwrap().len(), 2);
        assert!(store.find_by_assignee("nobody").await.unwrap().is_empty());
    }
}
