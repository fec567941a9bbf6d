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

//! HTTP routing for the bug tracker API

use crate::auth::extract_token_from_header;
use crate::error::{ApiError, ApiResult, TrackerError};
use crate::handlers::{auth, bugs, health};
use crate::models::User;
use crate::server::AppState;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use tracing::{info, warn};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const CORS_ALLOW_HEADERS: &str = "Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, Authorization, accept, origin, Cache-Control, X-Requested-With";

/// HTTP router for the bug tracker API
pub struct Router {
    state: AppState,
    openapi_spec: String,
}

impl Router {
    /// Create a new router
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            openapi_spec: generate_openapi_spec(),
        }
    }

    /// Handle a request end to end: route it under the configured deadline,
    /// render any error and attach CORS headers. Never fails.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let path = req.uri().path().to_string();
        let origin = req.headers().get(header::ORIGIN).and_then(|v| v.to_str().ok()).map(str::to_string);

        // Dropping the routing future on timeout cancels any in-flight store call
        let mut response = match tokio::time::timeout(self.state.config.request_timeout(), self.route(req)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => e.into_response(&path),
            Err(_) => {
                warn!("Request timed out: {}", path);
                ApiError::GatewayTimeout {
                    message: "Request timed out".to_string(),
                }
                .into_response(&path)
            }
        };

        self.apply_cors(response.headers_mut(), origin.as_deref());
        response
    }

    /// Route a request to the appropriate handler
    pub async fn route<B>(&self, req: Request<B>) -> ApiResult<Response<Full<Bytes>>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_string();
        let method = parts.method.clone();

        info!("Routing request: {} {}", method, path);

        // CORS preflight
        if method == Method::OPTIONS {
            return Ok(Response::builder().status(StatusCode::NO_CONTENT).body(Full::new(Bytes::new()))?);
        }

        let body = read_body(body, self.state.config.max_body_size).await?;
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').collect();

        // Public endpoints
        match (&method, segments.as_slice()) {
            (&Method::GET, ["", "api", "health"]) => return health::health_check().await,
            (&Method::POST, ["", "api", "auth", "register"]) => return auth::register(&self.state, body).await,
            (&Method::POST, ["", "api", "auth", "login"]) => return auth::login(&self.state, body).await,
            (&Method::GET, ["", "api", "auth", "developers"]) => return auth::list_developers(&self.state).await,
            (&Method::GET, ["", "openapi.json"]) => return self.serve_openapi_spec(),
            _ => {}
        }

        if !matches!(segments.as_slice(), ["", "api", "bugs", ..]) {
            warn!("Route not found: {} {}", method, path);
            return Err(ApiError::NotFound {
                message: format!("Route not found: {} {}", method, path),
            });
        }

        // Everything under /api/bugs needs a session, including unknown subpaths
        let actor = self.authenticate(&parts.headers).await?;

        match (&method, segments.as_slice()) {
            (&Method::POST, ["", "api", "bugs"]) => bugs::create_bug(&self.state, &actor, body).await,
            (&Method::GET, ["", "api", "bugs"]) => bugs::list_bugs(&self.state, &actor).await,
            (&Method::GET, ["", "api", "bugs", id]) => bugs::get_bug(&self.state, &actor, id).await,
            (&Method::PUT, ["", "api", "bugs", id]) => bugs::update_bug(&self.state, &actor, id, body).await,
            (&Method::DELETE, ["", "api", "bugs", id]) => bugs::delete_bug(&self.state, &actor, id).await,
            (&Method::PATCH, ["", "api", "bugs", id, "status"]) => bugs::update_bug_status(&self.state, &actor, id, body).await,
            (&Method::POST, ["", "api", "bugs", id, "assign"]) => bugs::assign_bug(&self.state, &actor, id, body).await,
            _ => {
                warn!("Route not found: {} {}", method, path);
                Err(ApiError::NotFound {
                    message: format!("Route not found: {} {}", method, path),
                })
            }
        }
    }

    /// Resolve the bearer token on a request to the acting user
    async fn authenticate(&self, headers: &HeaderMap) -> ApiResult<User> {
        let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
            warn!("Missing authorization header for protected path");
            return Err(ApiError::Unauthorized {
                message: "Authorization header is required".to_string(),
            });
        };

        let auth_str = auth_header.to_str().map_err(|_| {
            warn!("Authorization header contains invalid UTF-8");
            ApiError::Unauthorized {
                message: "Invalid authorization header encoding".to_string(),
            }
        })?;

        let token = extract_token_from_header(auth_str)?;
        match self.state.sessions.validate(token).await {
            Ok(user) => Ok(user),
            Err(e @ TrackerError::InvalidToken { .. }) => {
                warn!("Token validation failed: {}", e);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn apply_cors(&self, headers: &mut HeaderMap, origin: Option<&str>) {
        if let Some(origin) = origin {
            let config = &self.state.config;
            let allowed = config.cors_allow_any || config.cors_origins.iter().any(|o| o == origin);
            if allowed {
                if let Ok(value) = HeaderValue::from_str(origin) {
                    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
                    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
                }
            }
        }

        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(CORS_ALLOW_METHODS));
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(CORS_ALLOW_HEADERS));
        headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static("Content-Length"));
        headers.insert(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("false"));
    }

    /// Serve OpenAPI specification
    fn serve_openapi_spec(&self) -> ApiResult<Response<Full<Bytes>>> {
        Ok(Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(self.openapi_spec.clone())))?)
    }
}

/// Collect a request body, refusing anything over `limit` bytes
async fn read_body<B>(body: B, limit: usize) -> ApiResult<Bytes>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(ApiError::PayloadTooLarge {
            message: format!("Request body exceeds {} bytes", limit),
        }),
        Err(e) => Err(ApiError::BadRequest {
            message: format!("Failed to read request body: {}", e),
        }),
    }
}

/// Generate OpenAPI specification
fn generate_openapi_spec() -> String {
    #[derive(OpenApi)]
    #[openapi(
        paths(
            // Health endpoints
            health::health_check,

            // Auth endpoints
            auth::register,
            auth::login,
            auth::list_developers,

            // Bug endpoints
            bugs::create_bug,
            bugs::list_bugs,
            bugs::get_bug,
            bugs::update_bug,
            bugs::delete_bug,
            bugs::update_bug_status,
            bugs::assign_bug,
        ),
        components(
            schemas(
                crate::models::Role,
                crate::models::BugStatus,
                crate::models::Priority,
                crate::models::RegisterRequest,
                crate::models::RegisterResponse,
                crate::models::LoginRequest,
                crate::models::LoginResponse,
                crate::models::UserResponse,
                crate::models::CreateBugRequest,
                crate::models::UpdateBugRequest,
                crate::models::UpdateBugStatusRequest,
                crate::models::AssignBugRequest,
                crate::models::BugResponse,
                crate::models::MessageResponse,
                crate::models::HealthResponse,
            )
        ),
        tags(
            (name = "Health", description = "Health check endpoint"),
            (name = "Authentication", description = "Registration, login and user lookup"),
            (name = "Bugs", description = "Bug reporting, assignment and workflow")
        ),
        modifiers(&SecurityAddon)
    )]
    struct ApiDoc;

    struct SecurityAddon;

    impl Modify for SecurityAddon {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(components) = openapi.components.as_mut() {
                components.add_security_scheme("bearer_auth", SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()))
            }
        }
    }

    ApiDoc::openapi().to_pretty_json().unwrap_or_else(|_| "{}".to_string())
}
