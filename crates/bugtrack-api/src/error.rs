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

//! Error handling for the bug tracker
//!
//! Three layers of errors live here:
//! - [`StoreError`] is raised by repository implementations
//! - [`TrackerError`] is the typed outcome of every core operation
//! - [`ApiError`] is the boundary error, rendered in RFC 7807 Problem Details format

use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Message returned to callers in place of any internal failure detail
pub const OPAQUE_FAILURE: &str = "An internal error occurred";

/// Errors raised by the persistence layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage backend error: {message}")]
    Backend { message: String },

    #[error("Storage conflict: {message}")]
    Conflict { message: String },
}

/// Domain errors surfaced by the core services
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Not authorized to {action}")]
    Unauthorized { action: &'static str },

    #[error("Email already exists: {email}")]
    EmailAlreadyExists { email: String },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid assignee: {message}")]
    InvalidAssignee { message: String },

    #[error("Invalid token: {reason}")]
    InvalidToken { reason: String },

    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TrackerError {
    pub fn bug_not_found(id: &str) -> Self {
        TrackerError::NotFound { resource: "Bug", id: id.to_string() }
    }

    pub fn user_not_found(id: &str) -> Self {
        TrackerError::NotFound { resource: "User", id: id.to_string() }
    }

    pub fn invalid_token(reason: impl Into<String>) -> Self {
        TrackerError::InvalidToken { reason: reason.into() }
    }
}

/// Result type for core operations
pub type TrackerResult<T> = Result<T, TrackerError>;

/// API error types following REST conventions
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    #[error("Unprocessable entity: {message}")]
    UnprocessableEntity { message: String },

    #[error("Internal server error: {message}")]
    InternalServerError { message: String },

    #[error("Gateway timeout: {message}")]
    GatewayTimeout { message: String },

    #[error("Serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::Unauthorized { .. } => "unauthorized",
            ApiError::Forbidden { .. } => "forbidden",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::PayloadTooLarge { .. } => "payload_too_large",
            ApiError::UnprocessableEntity { .. } => "unprocessable_entity",
            ApiError::InternalServerError { .. } => "internal_server_error",
            ApiError::GatewayTimeout { .. } => "gateway_timeout",
            ApiError::SerdeJsonError(_) => "json_error",
            ApiError::HttpError(_) => "http_error",
            ApiError::IoError(_) => "io_error",
        }
    }

    /// Human-readable detail that is safe to return to the caller.
    /// Transport and internal failures never echo their inner text.
    pub fn public_detail(&self) -> String {
        match self {
            ApiError::BadRequest { message }
            | ApiError::Unauthorized { message }
            | ApiError::Forbidden { message }
            | ApiError::NotFound { message }
            | ApiError::Conflict { message }
            | ApiError::PayloadTooLarge { message }
            | ApiError::UnprocessableEntity { message }
            | ApiError::GatewayTimeout { message } => message.clone(),
            _ => OPAQUE_FAILURE.to_string(),
        }
    }

    /// Render this error as a problem details response for the given request path
    pub fn into_response(self, instance: &str) -> Response<Full<Bytes>> {
        let status_code = self.status_code();
        let problem_details = ProblemDetails::new(&self, instance.to_string());

        if status_code.is_server_error() {
            error!("API Error: {} - {}", status_code, self);
        }

        let json = match serde_json::to_string(&problem_details) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize error response: {}", e);
                r#"{"type":"/problems/internal_server_error","title":"Internal Server Error","status":500,"detail":"An internal error occurred","instance":"/"}"#.to_string()
            }
        };

        Response::builder()
            .status(status_code)
            .header("content-type", "application/problem+json")
            .header("cache-control", "no-cache")
            .body(Full::new(Bytes::from(json)))
            .unwrap_or_else(|e| {
                error!("Failed to build error response: {}", e);
                let mut fallback = Response::new(Full::new(Bytes::from("Internal Server Error")));
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}

/// RFC 7807 Problem Details response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// A URI reference that identifies the problem type
    #[serde(rename = "type")]
    pub problem_type: String,

    /// A short, human-readable summary of the problem type
    pub title: String,

    /// The HTTP status code generated by the origin server
    pub status: u16,

    /// A human-readable explanation specific to this occurrence
    pub detail: String,

    /// A URI reference that identifies the specific occurrence
    pub instance: String,
}

impl ProblemDetails {
    /// Create a new problem details response
    pub fn new(error: &ApiError, instance: String) -> Self {
        let status_code = error.status_code();

        Self {
            problem_type: format!("/problems/{}", error.error_type()),
            title: status_code.canonical_reason().unwrap_or("Unknown Error").to_string(),
            status: status_code.as_u16(),
            detail: error.public_detail(),
            instance,
        }
    }
}

/// Map domain outcomes onto boundary errors. Storage and internal failures
/// are logged here and replaced by an opaque message.
impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::NotFound { resource, .. } => ApiError::NotFound {
                message: format!("{} not found", resource),
            },
            TrackerError::Unauthorized { action } => ApiError::Forbidden {
                message: format!("Not authorized to {}", action),
            },
            TrackerError::EmailAlreadyExists { .. } => ApiError::Conflict {
                message: "Email already exists".to_string(),
            },
            TrackerError::InvalidCredentials => ApiError::Unauthorized {
                message: "Invalid email or password".to_string(),
            },
            TrackerError::InvalidToken { .. } => ApiError::Unauthorized {
                message: "Invalid or expired token".to_string(),
            },
            TrackerError::InvalidAssignee { message } => ApiError::UnprocessableEntity { message },
            other @ (TrackerError::Storage(_) | TrackerError::Internal { .. }) => {
                error!("Core operation failed: {}", other);
                ApiError::InternalServerError {
                    message: OPAQUE_FAILURE.to_string(),
                }
            }
        }
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

impl From<hyper::http::Error> for ApiError {
    fn from(err: hyper::http::Error) -> Self {
        ApiError::HttpError(err.to_string())
    }
}
