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

//! Bug handlers. Every handler receives the actor resolved from the
//! session token by the router.

use crate::error::ApiError;
use crate::handlers::{json_response, parse_json};
use crate::models::{AssignBugRequest, BugResponse, CreateBugRequest, MessageResponse, UpdateBugRequest, UpdateBugStatusRequest, User};
use crate::server::AppState;
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use tracing::info;

/// Create bug handler
/// POST /api/bugs
#[utoipa::path(
    post,
    path = "/api/bugs",
    request_body = CreateBugRequest,
    responses(
        (status = 201, description = "Bug created", body = BugResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Bugs"
)]
pub async fn create_bug(state: &AppState, actor: &User, body: Bytes) -> Result<Response<Full<Bytes>>, ApiError> {
    info!("Processing create bug request from {}", actor.id);

    let request: CreateBugRequest = parse_json(&body)?;
    request.validate().map_err(|message| ApiError::BadRequest { message })?;

    let bug = state.bugs.create(request, actor).await?;
    json_response(StatusCode::CREATED, &bug)
}

/// List bugs handler. Developers see only their assignments.
/// GET /api/bugs
#[utoipa::path(
    get,
    path = "/api/bugs",
    responses(
        (status = 200, description = "Bugs visible to the caller", body = [BugResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Bugs"
)]
pub async fn list_bugs(state: &AppState, actor: &User) -> Result<Response<Full<Bytes>>, ApiError> {
    info!("Processing list bugs request from {} ({})", actor.id, actor.role);

    let bugs = state.bugs.list_for(actor).await?;
    json_response(StatusCode::OK, &bugs)
}

/// Get bug handler
/// GET /api/bugs/{id}
#[utoipa::path(
    get,
    path = "/api/bugs/{id}",
    params(("id" = String, Path, description = "Bug ID")),
    responses(
        (status = 200, description = "Bug found", body = BugResponse),
        (status = 404, description = "Bug not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Bugs"
)]
pub async fn get_bug(state: &AppState, actor: &User, id: &str) -> Result<Response<Full<Bytes>>, ApiError> {
    info!("Processing get bug {} request from {}", id, actor.id);

    let bug = state.bugs.get_by_id(id).await?;
    json_response(StatusCode::OK, &bug)
}

/// Update bug handler
/// PUT /api/bugs/{id}
#[utoipa::path(
    put,
    path = "/api/bugs/{id}",
    params(("id" = String, Path, description = "Bug ID")),
    request_body = UpdateBugRequest,
    responses(
        (status = 200, description = "Bug updated", body = BugResponse),
        (status = 403, description = "Not authorized to edit this bug"),
        (status = 404, description = "Bug not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Bugs"
)]
pub async fn update_bug(state: &AppState, actor: &User, id: &str, body: Bytes) -> Result<Response<Full<Bytes>>, ApiError> {
    info!("Processing update bug {} request from {}", id, actor.id);

    let request: UpdateBugRequest = parse_json(&body)?;
    let bug = state.bugs.update(id, request, actor).await?;
    json_response(StatusCode::OK, &bug)
}

/// Delete bug handler
/// DELETE /api/bugs/{id}
#[utoipa::path(
    delete,
    path = "/api/bugs/{id}",
    params(("id" = String, Path, description = "Bug ID")),
    responses(
        (status = 200, description = "Bug deleted", body = MessageResponse),
        (status = 403, description = "Only managers and admins can delete bugs"),
        (status = 404, description = "Bug not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Bugs"
)]
pub async fn delete_bug(state: &AppState, actor: &User, id: &str) -> Result<Response<Full<Bytes>>, ApiError> {
    info!("Processing delete bug {} request from {}", id, actor.id);

    state.bugs.delete(id, actor).await?;
    json_response(
        StatusCode::OK,
        &MessageResponse {
            message: "Bug deleted successfully".to_string(),
        },
    )
}

/// Update bug status handler
/// PATCH /api/bugs/{id}/status
#[utoipa::path(
    patch,
    path = "/api/bugs/{id}/status",
    params(("id" = String, Path, description = "Bug ID")),
    request_body = UpdateBugStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = BugResponse),
        (status = 403, description = "Only the assigned developer can change the status"),
        (status = 404, description = "Bug not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Bugs"
)]
pub async fn update_bug_status(state: &AppState, actor: &User, id: &str, body: Bytes) -> Result<Response<Full<Bytes>>, ApiError> {
    info!("Processing update status of bug {} request from {}", id, actor.id);

    let request: UpdateBugStatusRequest = parse_json(&body)?;
    let bug = state.bugs.update_status(id, request.status, actor).await?;
    json_response(StatusCode::OK, &bug)
}

/// Assign bug handler
/// POST /api/bugs/{id}/assign
#[utoipa::path(
    post,
    path = "/api/bugs/{id}/assign",
    params(("id" = String, Path, description = "Bug ID")),
    request_body = AssignBugRequest,
    responses(
        (status = 200, description = "Bug assigned", body = BugResponse),
        (status = 403, description = "Only managers and admins can assign bugs"),
        (status = 404, description = "Bug not found"),
        (status = 422, description = "Assignee is missing or not a developer")
    ),
    security(("bearer_auth" = [])),
    tag = "Bugs"
)]
pub async fn assign_bug(state: &AppState, actor: &User, id: &str, body: Bytes) -> Result<Response<Full<Bytes>>, ApiError> {
    info!("Processing assign bug {} request from {}", id, actor.id);

    let request: AssignBugRequest = parse_json(&body)?;
    if request.developer_id.trim().is_empty() {
        return Err(ApiError::BadRequest {
            message: "developer_id is required".to_string(),
        });
    }

    let bug = state.bugs.assign(id, &request.developer_id, actor).await?;
    json_response(StatusCode::OK, &bug)
}
