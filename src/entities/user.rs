//! API users and their authentication tokens

use super::author::missing;
use crate::core::error::ApiError;
use crate::impl_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// An account that may obtain a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl_entity!(User);

/// Opaque bearer credential; one per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthToken {
    pub key: String,
    pub user_id: i64,
    pub created: DateTime<Utc>,
}

impl AuthToken {
    /// Issue a fresh token for a user
    pub fn generate(user_id: i64) -> Self {
        Self {
            key: Uuid::new_v4().simple().to_string(),
            user_id,
            created: Utc::now(),
        }
    }
}

/// Body of `POST /api-token-auth/`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, message = "This field may not be blank.")
    )]
    pub username: Option<String>,

    #[validate(
        required(message = "This field is required."),
        length(min = 1, message = "This field may not be blank.")
    )]
    pub password: Option<String>,
}

impl TokenRequest {
    /// Validated `(username, password)`
    pub fn into_credentials(self) -> Result<(String, String), ApiError> {
        self.validate()?;
        match (self.username, self.password) {
            (Some(username), Some(password)) => Ok((username, password)),
            _ => Err(missing(&["password", "username"])),
        }
    }
}

/// Body returned by `POST /api-token-auth/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
