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

//! Credential store: password hashing and user records

use crate::config::HashParams;
use crate::error::{StoreError, TrackerError, TrackerResult};
use crate::models::{NewUser, Role, User};
use crate::store::UserRepository;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use std::sync::Arc;
use tracing::{debug, info};

/// Owns password hashing and the persisted user records
pub struct CredentialStore {
    users: Arc<dyn UserRepository>,
    hasher: Argon2<'static>,
    // Verified against when the email is unknown so login timing does not
    // reveal whether an account exists
    dummy_hash: String,
}

impl CredentialStore {
    /// Create a credential store hashing with the given Argon2id work factor
    pub fn new(users: Arc<dyn UserRepository>, params: HashParams) -> TrackerResult<Self> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None).map_err(|e| TrackerError::Internal {
            message: format!("Invalid password hashing parameters: {}", e),
        })?;
        let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut store = Self {
            users,
            hasher,
            dummy_hash: String::new(),
        };
        store.dummy_hash = store.hash_password("bugtrack-timing-equalizer")?;
        Ok(store)
    }

    /// Derive a salted one-way hash in PHC string format
    pub fn hash_password(&self, raw_password: &str) -> TrackerResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher
            .hash_password(raw_password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| TrackerError::Internal {
                message: format!("Password hashing failed: {}", e),
            })
    }

    /// Check a raw password against a stored hash. The comparison runs
    /// through Argon2's own verifier; a malformed hash never verifies.
    pub fn verify(&self, raw_password: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => self.hasher.verify_password(raw_password.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                debug!("Stored password hash could not be parsed: {}", e);
                false
            }
        }
    }

    /// Register a new user
    pub async fn register(&self, name: &str, email: &str, raw_password: &str, role: Role) -> TrackerResult<User> {
        if self.users.find_by_email(email).await?.is_some() {
            return Err(TrackerError::EmailAlreadyExists { email: email.to_string() });
        }

        let password_hash = self.hash_password(raw_password)?;
        let new_user = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            role,
        };

        // The repository re-checks uniqueness atomically; a concurrent
        // registration that slipped past the lookup above lands here
        let user = match self.users.create(new_user).await {
            Ok(user) => user,
            Err(StoreError::Conflict { .. }) => return Err(TrackerError::EmailAlreadyExists { email: email.to_string() }),
            Err(e) => return Err(e.into()),
        };

        info!("Registered user {} with role {}", user.id, user.role);
        Ok(user)
    }

    /// Resolve an email/password pair to a user. Unknown email and wrong
    /// password are indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, raw_password: &str) -> TrackerResult<User> {
        match self.users.find_by_email(email).await? {
            Some(user) if self.verify(raw_password, &user.password_hash) => Ok(user),
            Some(_) => Err(TrackerError::InvalidCredentials),
            None => {
                let _ = self.verify(raw_password, &self.dummy_hash);
                Err(TrackerError::InvalidCredentials)
            }
        }
    }

    pub async fn find_by_email(&self, email: &str) -> TrackerResult<Option<User>> {
        Ok(self.users.find_by_email(email).await?)
    }

    pub async fn find_by_id(&self, id: &str) -> TrackerResult<Option<User>> {
        Ok(self.users.find_by_id(id).await?)
    }

    pub async fn find_by_role(&self, role: Role) -> TrackerResult<Vec<User>> {
        Ok(self.users.find_by_role(role).await?)
    }
}
