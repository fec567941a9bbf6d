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

//! Authentication handlers

use crate::error::ApiError;
use crate::handlers::{json_response, parse_json};
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, Role, UserResponse};
use crate::server::AppState;
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use tracing::info;

/// Register handler
/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 409, description = "Email already exists"),
        (status = 400, description = "Bad request")
    ),
    tag = "Authentication"
)]
pub async fn register(state: &AppState, body: Bytes) -> Result<Response<Full<Bytes>>, ApiError> {
    info!("Processing user registration request");

    let request: RegisterRequest = parse_json(&body)?;
    request.validate().map_err(|message| ApiError::BadRequest { message })?;

    let user = state.credentials.register(&request.name, &request.email, &request.password, request.role).await?;

    json_response(StatusCode::CREATED, &RegisterResponse { user: user.to_response() })
}

/// Login handler
/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 400, description = "Bad request")
    ),
    tag = "Authentication"
)]
pub async fn login(state: &AppState, body: Bytes) -> Result<Response<Full<Bytes>>, ApiError> {
    info!("Processing login request");

    let request: LoginRequest = parse_json(&body)?;
    let login = state.sessions.login(&request.email, &request.password).await?;

    json_response(StatusCode::OK, &login)
}

/// List developers handler
/// GET /api/auth/developers
#[utoipa::path(
    get,
    path = "/api/auth/developers",
    responses(
        (status = 200, description = "All users with the developer role", body = [UserResponse])
    ),
    tag = "Authentication"
)]
pub async fn list_developers(state: &AppState) -> Result<Response<Full<Bytes>>, ApiError> {
    info!("Processing list developers request");

    let developers: Vec<UserResponse> = state.credentials.find_by_role(Role::Developer).await?.iter().map(|user| user.to_response()).collect();

    json_response(StatusCode::OK, &developers)
}
