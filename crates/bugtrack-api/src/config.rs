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

//! Configuration management for the bug tracker API

use std::env;
use std::time::Duration;
use tracing::warn;

/// Default JWT secret; only suitable for local development
pub const DEFAULT_JWT_SECRET: &str = "default-secret-change-in-production";

/// Session token lifetime used when none or an unusable one is configured
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Longest accepted session token lifetime (one year)
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

/// Argon2 work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Configuration for the bug tracker API
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// JWT secret key for session tokens
    pub jwt_secret: String,

    /// Session token lifetime in hours
    pub token_ttl_hours: i64,

    /// Origins always echoed back in CORS responses
    pub cors_origins: Vec<String>,

    /// Echo any origin, not only the allow-listed ones
    pub cors_allow_any: bool,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Password hashing work factor
    pub hash_params: HashParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            cors_origins: default_cors_origins(),
            cors_allow_any: true,
            request_timeout_secs: 30,
            max_body_size: 1024 * 1024, // 1MB
            hash_params: HashParams::default(),
        }
    }
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string(), "http://localhost:5174".to_string(), "http://localhost:3000".to_string()]
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Accept a token lifetime in `1..=MAX_TOKEN_TTL_HOURS`, otherwise fall back to the default
fn checked_token_ttl_hours(hours: i64) -> i64 {
    if (1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        return hours;
    }

    warn!(
        "Token TTL of {} hours is outside 1..={}; using {} hours",
        hours, MAX_TOKEN_TTL_HOURS, DEFAULT_TOKEN_TTL_HOURS
    );
    DEFAULT_TOKEN_TTL_HOURS
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_address: env::var("BUGTRACK_BIND_ADDRESS").unwrap_or(defaults.bind_address),

            jwt_secret: env::var("BUGTRACK_JWT_SECRET").ok().filter(|s| !s.is_empty()).unwrap_or(defaults.jwt_secret),

            token_ttl_hours: checked_token_ttl_hours(env_parse("BUGTRACK_TOKEN_TTL_HOURS", defaults.token_ttl_hours)),

            cors_origins: env::var("BUGTRACK_CORS_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or(defaults.cors_origins),

            cors_allow_any: env_parse("BUGTRACK_CORS_ALLOW_ANY", defaults.cors_allow_any),

            request_timeout_secs: env_parse("BUGTRACK_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),

            max_body_size: env_parse("BUGTRACK_MAX_BODY_SIZE", defaults.max_body_size),

            hash_params: HashParams {
                memory_kib: env_parse("BUGTRACK_HASH_MEMORY_KIB", defaults.hash_params.memory_kib),
                iterations: env_parse("BUGTRACK_HASH_ITERATIONS", defaults.hash_params.iterations),
                parallelism: env_parse("BUGTRACK_HASH_PARALLELISM", defaults.hash_params.parallelism),
            },
        }
    }

    /// Whether the shipped development secret is still in use
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Session token lifetime. Out-of-range values fall back to the default.
    pub fn token_ttl(&self) -> chrono::Duration {
        let hours = checked_token_ttl_hours(self.token_ttl_hours);
        chrono::Duration::try_hours(hours).unwrap_or_else(|| chrono::Duration::hours(DEFAULT_TOKEN_TTL_HOURS))
    }
}
