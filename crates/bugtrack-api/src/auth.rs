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

//! Session tokens and login
//!
//! Tokens are stateless HS256 JWTs. Validation re-resolves the embedded user
//! id on every call, so role changes and deleted accounts take effect
//! immediately even though the token itself cannot be revoked.

use crate::credentials::CredentialStore;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{LoginResponse, Role, User};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

const ISSUER: &str = "bugtrack-api";

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Email at issuance
    pub email: String,

    /// Role at issuance. Informational only; authorization uses the
    /// freshly loaded user record.
    pub role: Role,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create new claims for a user. Fails if the expiry is not a
    /// representable instant.
    pub fn new(user: &User, expires_in: Duration) -> TrackerResult<Self> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(expires_in).ok_or_else(|| TrackerError::Internal {
            message: format!("Token lifetime {} overflows the expiry timestamp", expires_in),
        })?;

        Ok(Self {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        })
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    /// Create a new JWT manager with a secret key
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    /// Create a JWT token
    pub fn create_token(&self, claims: &Claims) -> TrackerResult<String> {
        let header = Header::new(Algorithm::HS256);
        encode(&header, claims, &self.encoding_key).map_err(|e| TrackerError::Internal {
            message: format!("Failed to sign token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> TrackerResult<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| TrackerError::invalid_token(format!("{:?}", e.kind())))?;

        let claims = token_data.claims;

        if claims.is_expired() {
            return Err(TrackerError::invalid_token("token has expired"));
        }

        Ok(claims)
    }
}

/// Issues and validates session tokens
pub struct SessionService {
    jwt_manager: JwtManager,
    credentials: Arc<CredentialStore>,
    token_ttl: Duration,
}

impl SessionService {
    /// Create a new session service. The secret is fixed for the process lifetime.
    pub fn new(jwt_secret: &str, credentials: Arc<CredentialStore>, token_ttl: Duration) -> Self {
        Self {
            jwt_manager: JwtManager::new(jwt_secret),
            credentials,
            token_ttl,
        }
    }

    /// Issue a signed token for a user
    pub fn issue(&self, user: &User) -> TrackerResult<String> {
        let claims = Claims::new(user, self.token_ttl)?;
        self.jwt_manager.create_token(&claims)
    }

    /// Validate a token and resolve the current user record behind it
    pub async fn validate(&self, token: &str) -> TrackerResult<User> {
        let claims = self.jwt_manager.validate_token(token)?;

        match self.credentials.find_by_id(&claims.sub).await? {
            Some(user) => Ok(user),
            None => {
                warn!("Token references a user that no longer exists: {}", claims.sub);
                Err(TrackerError::invalid_token("user no longer exists"))
            }
        }
    }

    /// Authenticate by email and password and issue a session token
    pub async fn login(&self, email: &str, raw_password: &str) -> TrackerResult<LoginResponse> {
        let user = self.credentials.authenticate(email, raw_password).await?;
        let token = self.issue(&user)?;

        info!("User {} logged in", user.id);

        Ok(LoginResponse {
            token,
            user: user.to_response(),
        })
    }
}

/// Extract the token from an Authorization header value. The `Bearer `
/// prefix is optional; a bare token is accepted as-is.
pub fn extract_token_from_header(auth_header: &str) -> TrackerResult<&str> {
    let token = auth_header.strip_prefix("Bearer ").unwrap_or(auth_header).trim();
    if token.is_empty() {
        return Err(TrackerError::invalid_token("empty authorization header"));
    }
    Ok(token)
}
