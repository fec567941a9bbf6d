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

//! Data models for the bug tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

// ====== Enumerations ======

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Developer,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Developer => "developer",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Managers and admins share every elevated privilege
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "developer" => Ok(Role::Developer),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Bug status. Any value may follow any other; who may change it is
/// decided by the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BugStatus {
    Open,
    InProgress,
    Resolved,
}

impl BugStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BugStatus::Open => "open",
            BugStatus::InProgress => "in-progress",
            BugStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for BugStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bug priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(format!("Unknown priority: {}", other)),
        }
    }
}

// ====== Stored entities ======

/// Persisted user record. The password hash never leaves the crate's
/// core; use [`User::to_response`] for anything outbound.
#[derive(Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public projection of this user
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// User fields supplied on creation; the repository assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Persisted bug record
#[derive(Debug, Clone, PartialEq)]
pub struct Bug {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: BugStatus,
    pub priority: Priority,

    /// Reporting user id, fixed at creation
    pub reported_by: String,

    /// Assigned developer id
    pub assigned_to: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Bug fields supplied on creation; the repository assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewBug {
    pub title: String,
    pub description: String,
    pub status: BugStatus,
    pub priority: Priority,
    pub reported_by: String,
}

// ====== Authentication Models ======

/// Registration request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl RegisterRequest {
    pub const MIN_PASSWORD_LEN: usize = 6;

    /// Validate field shapes before touching the credential store
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        if !self.email.contains('@') {
            return Err("email must be a valid address".to_string());
        }
        if self.password.chars().count() < Self::MIN_PASSWORD_LEN {
            return Err(format!("password must be at least {} characters", Self::MIN_PASSWORD_LEN));
        }
        Ok(())
    }
}

/// Login request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public user representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Registration response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub user: UserResponse,
}

/// Login response carrying the session token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// JWT session token
    pub token: String,

    pub user: UserResponse,
}

// ====== Bug Models ======

/// Request to report a new bug
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateBugRequest {
    pub title: String,
    pub description: String,
    pub priority: Priority,

    /// Accepted for compatibility with older clients and ignored;
    /// new bugs always start open
    #[serde(default)]
    pub status: Option<BugStatus>,
}

impl CreateBugRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("description is required".to_string());
        }
        Ok(())
    }
}

/// Partial bug update. Absent or empty fields are left unchanged.
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateBugRequest {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "empty_priority_as_none")]
    pub priority: Option<Priority>,
}

impl UpdateBugRequest {
    /// Title to apply, if any
    pub fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    /// Description to apply, if any
    pub fn description(&self) -> Option<&str> {
        non_empty(&self.description)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// `null`, absent and `""` all mean "keep the current priority"
fn empty_priority_as_none<'de, D>(deserializer: D) -> Result<Option<Priority>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.is_empty() => raw.parse().map(Some).map_err(de::Error::custom),
        _ => Ok(None),
    }
}

/// Request to change a bug's status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateBugStatusRequest {
    pub status: BugStatus,
}

/// Request to assign a bug to a developer
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignBugRequest {
    pub developer_id: String,
}

/// Public bug representation with user references resolved
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BugResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: BugStatus,
    pub priority: Priority,
    pub reported_by: UserResponse,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserResponse>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ====== Misc Models ======

/// Plain acknowledgement body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}
