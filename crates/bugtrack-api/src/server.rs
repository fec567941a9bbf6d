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

//! HTTP server implementation using Hyper

use crate::auth::SessionService;
use crate::bugs::BugService;
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::error::{ApiError, ApiResult, TrackerResult};
use crate::router::Router;
use crate::store::{BugRepository, MemoryBugRepository, MemoryUserRepository, UserRepository};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Services shared by every request. Built once at startup and never mutated.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub credentials: Arc<CredentialStore>,
    pub sessions: Arc<SessionService>,
    pub bugs: Arc<BugService>,
}

impl AppState {
    /// Wire the services on top of the given repositories
    pub fn new(config: Config, users: Arc<dyn UserRepository>, bugs: Arc<dyn BugRepository>) -> TrackerResult<Self> {
        let credentials = Arc::new(CredentialStore::new(users, config.hash_params)?);
        let sessions = Arc::new(SessionService::new(&config.jwt_secret, credentials.clone(), config.token_ttl()));
        let bugs = Arc::new(BugService::new(bugs, credentials.clone()));

        Ok(Self {
            config: Arc::new(config),
            credentials,
            sessions,
            bugs,
        })
    }

    /// Wire the services on top of fresh in-memory repositories
    pub fn in_memory(config: Config) -> TrackerResult<Self> {
        Self::new(config, Arc::new(MemoryUserRepository::new()), Arc::new(MemoryBugRepository::new()))
    }
}

/// API server using Hyper
pub struct ApiServer {
    bind_address: SocketAddr,
    router: Arc<Router>,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: AppState) -> ApiResult<Self> {
        let bind_address: SocketAddr = state.config.bind_address.parse().map_err(|e| ApiError::BadRequest {
            message: format!("Invalid bind address: {}", e),
        })?;

        if state.config.uses_default_secret() {
            warn!("BUGTRACK_JWT_SECRET is not set; using the built-in development secret");
        }

        let router = Arc::new(Router::new(state));

        Ok(Self { bind_address, router })
    }

    /// Get the bind address
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Start the server
    pub async fn run(self) -> ApiResult<()> {
        let listener = TcpListener::bind(self.bind_address).await?;

        info!("Bugtrack API listening on http://{}", self.bind_address);

        loop {
            let (stream, remote_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let io = TokioIo::new(stream);
            let router = self.router.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let router = router.clone();
                    async move { Ok::<_, Infallible>(router.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }
    }
}
