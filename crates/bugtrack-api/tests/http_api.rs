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

//! HTTP surface tests driving the router directly

use async_trait::async_trait;
use bugtrack_api::config::{Config, HashParams};
use bugtrack_api::error::StoreError;
use bugtrack_api::models::{Bug, BugStatus, NewBug};
use bugtrack_api::router::Router;
use bugtrack_api::server::AppState;
use bugtrack_api::store::{BugRepository, MemoryBugRepository, MemoryUserRepository};
use std::sync::Arc;
use std::time::Duration;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode};
use serde_json::{Value, json};

fn test_config() -> Config {
    Config {
        jwt_secret: "http-test-secret".to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        cors_allow_any: false,
        max_body_size: 4 * 1024,
        hash_params: HashParams {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        },
        ..Config::default()
    }
}

fn test_router() -> Router {
    Router::new(AppState::in_memory(test_config()).unwrap())
}

async fn send(router: &Router, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path).header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let body = body.map(|v| Bytes::from(serde_json::to_vec(&v).unwrap())).unwrap_or_default();
    let request = builder.body(Full::new(body)).unwrap();

    let response = router.handle(request).await;
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

async fn register_and_login(router: &Router, name: &str, email: &str, role: &str) -> (String, String) {
    let (status, body) = send(
        router,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": name, "email": email, "password": "pw123456", "role": role})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["user"]["id"].as_str().unwrap().to_string();
    assert!(body["user"].get("password").is_none());

    let (status, body) = send(router, Method::POST, "/api/auth/login", None, Some(json!({"email": email, "password": "pw123456"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id.as_str());
    (id, body["token"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn test_health() {
    let router = test_router();
    let (status, body) = send(&router, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_full_workflow_over_http() {
    let router = test_router();

    let (reporter_id, reporter_token) = register_and_login(&router, "Rita", "r@x.io", "developer").await;
    let (developer_id, developer_token) = register_and_login(&router, "Dan", "d@x.io", "developer").await;
    let (_, manager_token) = register_and_login(&router, "Mia", "m@x.io", "manager").await;

    let (status, developers) = send(&router, Method::GET, "/api/auth/developers", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(developers.as_array().unwrap().len(), 2);

    let (status, bug) = send(
        &router,
        Method::POST,
        "/api/bugs",
        Some(&reporter_token),
        Some(json!({"title": "Crash", "description": "Editor crashes on save", "priority": "high", "status": "resolved"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bug["status"], "open");
    assert_eq!(bug["reported_by"]["id"], reporter_id.as_str());
    assert!(bug.get("assigned_to").is_none());
    let bug_id = bug["id"].as_str().unwrap().to_string();

    let (status, listed) = send(&router, Method::GET, "/api/bugs", Some(&developer_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());

    let assign_path = format!("/api/bugs/{}/assign", bug_id);
    let (status, _) = send(&router, Method::POST, &assign_path, Some(&developer_token), Some(json!({"developer_id": developer_id}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, assigned) = send(&router, Method::POST, &assign_path, Some(&manager_token), Some(json!({"developer_id": developer_id}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assigned["assigned_to"]["id"], developer_id.as_str());

    let (status, listed) = send(&router, Method::GET, "/api/bugs", Some(&developer_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let status_path = format!("/api/bugs/{}/status", bug_id);
    let (status, _) = send(&router, Method::PATCH, &status_path, Some(&reporter_token), Some(json!({"status": "resolved"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(&router, Method::PATCH, &status_path, Some(&developer_token), Some(json!({"status": "resolved"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "resolved");

    let bug_path = format!("/api/bugs/{}", bug_id);
    let (status, fetched) = send(&router, Method::GET, &bug_path, Some(&reporter_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "resolved");

    let (status, _) = send(&router, Method::DELETE, &bug_path, Some(&developer_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&router, Method::DELETE, &bug_path, Some(&manager_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Bug deleted successfully");

    let (status, problem) = send(&router, Method::GET, &bug_path, Some(&manager_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["status"], 404);
    assert_eq!(problem["instance"], bug_path.as_str());
}

#[tokio::test]
async fn test_assign_to_non_developer_is_unprocessable() {
    let router = test_router();
    let (_, reporter_token) = register_and_login(&router, "Rita", "r@x.io", "developer").await;
    let (manager_id, manager_token) = register_and_login(&router, "Mia", "m@x.io", "manager").await;

    let (_, bug) = send(
        &router,
        Method::POST,
        "/api/bugs",
        Some(&reporter_token),
        Some(json!({"title": "Typo", "description": "Footer typo", "priority": "low"})),
    )
    .await;
    let path = format!("/api/bugs/{}/assign", bug["id"].as_str().unwrap());

    let (status, _) = send(&router, Method::POST, &path, Some(&manager_token), Some(json!({"developer_id": manager_id}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&router, Method::POST, &path, Some(&manager_token), Some(json!({"developer_id": "missing"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let router = test_router();

    let (status, problem) = send(&router, Method::GET, "/api/bugs", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(problem["type"], "/problems/unauthorized");

    let (status, _) = send(&router, Method::GET, "/api/bugs", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_raw_token_without_bearer_prefix() {
    let router = test_router();
    let (_, token) = register_and_login(&router, "Mia", "m@x.io", "manager").await;

    let request = Request::builder().method(Method::GET).uri("/api/bugs").header("authorization", token).body(Full::new(Bytes::new())).unwrap();
    let response = router.handle(request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_auth_error_statuses() {
    let router = test_router();
    register_and_login(&router, "Rita", "r@x.io", "developer").await;

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": "Again", "email": "r@x.io", "password": "pw123456", "role": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, wrong_password) = send(&router, Method::POST, "/api/auth/login", None, Some(json!({"email": "r@x.io", "password": "nope-nope"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, unknown_user) = send(&router, Method::POST, "/api/auth/login", None, Some(json!({"email": "ghost@x.io", "password": "pw123456"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["detail"], unknown_user["detail"]);

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": "Short", "email": "s@x.io", "password": "123", "role": "developer"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": "Boss", "email": "b@x.io", "password": "pw123456", "role": "superuser"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_and_oversized_bodies() {
    let router = test_router();

    let request = Request::builder().method(Method::POST).uri("/api/auth/login").body(Full::new(Bytes::from_static(b"{not json"))).unwrap();
    assert_eq!(router.handle(request).await.status(), StatusCode::BAD_REQUEST);

    let oversized = vec![b'a'; 8 * 1024];
    let request = Request::builder().method(Method::POST).uri("/api/auth/login").body(Full::new(Bytes::from(oversized))).unwrap();
    assert_eq!(router.handle(request).await.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_unknown_route() {
    let router = test_router();
    let (status, problem) = send(&router, Method::GET, "/api/nothing-here", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["type"], "/problems/not_found");
}

#[tokio::test]
async fn test_cors_headers() {
    let router = test_router();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/bugs")
        .header("origin", "http://localhost:5173")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = router.handle(request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["access-control-allow-origin"], "http://localhost:5173");
    assert!(response.headers()["access-control-allow-methods"].to_str().unwrap().contains("PATCH"));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/health")
        .header("origin", "http://evil.example")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = router.handle(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_openapi_document() {
    let router = test_router();
    let (status, doc) = send(&router, Method::GET, "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"].get("/api/bugs/{id}/assign").is_some());
    assert!(doc["components"]["securitySchemes"].get("bearer_auth").is_some());
}

#[tokio::test]
async fn test_partial_edit_keeps_fields_sent_empty() {
    let router = test_router();
    let (_, reporter_token) = register_and_login(&router, "Rita", "r@x.io", "developer").await;
    let (_, manager_token) = register_and_login(&router, "Mia", "m@x.io", "manager").await;

    let (_, bug) = send(
        &router,
        Method::POST,
        "/api/bugs",
        Some(&reporter_token),
        Some(json!({"title": "Crash", "description": "Editor crashes on save", "priority": "high"})),
    )
    .await;
    let path = format!("/api/bugs/{}", bug["id"].as_str().unwrap());

    let (status, edited) = send(&router, Method::PUT, &path, Some(&manager_token), Some(json!({"title": "T", "description": "", "priority": ""}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["title"], "T");
    assert_eq!(edited["description"], "Editor crashes on save");
    assert_eq!(edited["priority"], "high");

    let (status, edited) = send(&router, Method::PUT, &path, Some(&manager_token), Some(json!({"priority": "low"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["title"], "T");
    assert_eq!(edited["priority"], "low");
}

#[tokio::test]
async fn test_unknown_bug_subpath_requires_token_first() {
    let router = test_router();

    let (status, _) = send(&router, Method::GET, "/api/bugs/some-id/history", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, token) = register_and_login(&router, "Mia", "m@x.io", "manager").await;
    let (status, problem) = send(&router, Method::GET, "/api/bugs/some-id/history", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["type"], "/problems/not_found");
}

/// Bug store whose listings never finish in time
struct StalledBugRepository {
    inner: MemoryBugRepository,
}

#[async_trait]
impl BugRepository for StalledBugRepository {
    async fn create(&self, bug: NewBug) -> Result<Bug, StoreError> {
        self.inner.create(bug).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Bug>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self) -> Result<Vec<Bug>, StoreError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        self.inner.find_all().await
    }

    async fn find_by_assignee(&self, assignee_id: &str) -> Result<Vec<Bug>, StoreError> {
        self.inner.find_by_assignee(assignee_id).await
    }

    async fn update_status(&self, id: &str, status: BugStatus) -> Result<Option<Bug>, StoreError> {
        self.inner.update_status(id, status).await
    }

    async fn update(&self, bug: Bug) -> Result<Option<Bug>, StoreError> {
        self.inner.update(bug).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }
}

#[tokio::test]
async fn test_slow_request_times_out() {
    let config = Config {
        request_timeout_secs: 1,
        ..test_config()
    };
    let bugs = Arc::new(StalledBugRepository {
        inner: MemoryBugRepository::new(),
    });
    let state = AppState::new(config, Arc::new(MemoryUserRepository::new()), bugs).unwrap();
    let router = Router::new(state);

    let (_, token) = register_and_login(&router, "Mia", "m@x.io", "manager").await;
    let (status, problem) = send(&router, Method::GET, "/api/bugs", Some(&token), None).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(problem["type"], "/problems/gateway_timeout");
    assert_eq!(problem["instance"], "/api/bugs");
}
