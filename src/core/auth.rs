//! Authentication and authorization
//!
//! Every request resolves to an [`AuthContext`] from its `Authorization`
//! header, then the resource's [`PermissionTable`] decides whether the
//! requested [`Operation`] may proceed:
//!
//! | Operation               | anonymous | rejected | user    |
//! |-------------------------|-----------|----------|---------|
//! | list / retrieve         | allowed   | allowed  | allowed |
//! | create / update / delete| 401       | 403      | allowed |
//!
//! A *rejected* context carries a credential that could not be honoured
//! (unknown token, malformed header, inactive user).

use crate::core::error::{ApiError, ApiResult, RequestError, StorageResult};
use crate::core::service::UserService;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use async_trait::async_trait;
use axum::http::{HeaderMap, Method, header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Authorization context extracted from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    /// Token resolved to an active user
    User { user_id: i64, username: String },

    /// A credential was presented but could not be honoured
    Rejected { reason: String },

    /// No credential
    Anonymous,
}

impl AuthContext {
    /// Name used in logs
    pub fn principal(&self) -> &str {
        match self {
            AuthContext::User { username, .. } => username,
            AuthContext::Rejected { .. } => "<rejected>",
            AuthContext::Anonymous => "<anonymous>",
        }
    }
}

/// Resource operations, derived from the HTTP verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

/// Which route of a resource a request hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// `/api/<resource>/`
    Collection,
    /// `/api/<resource>/{id}/`
    Item,
}

impl Operation {
    /// Map a verb on a route to an operation; `None` for unsupported verbs
    pub fn from_method(method: &Method, target: Target) -> Option<Self> {
        match (target, method.as_str()) {
            (Target::Collection, "GET" | "HEAD") => Some(Operation::List),
            (Target::Collection, "POST") => Some(Operation::Create),
            (Target::Item, "GET" | "HEAD") => Some(Operation::Retrieve),
            (Target::Item, "PUT") => Some(Operation::Update),
            (Target::Item, "PATCH") => Some(Operation::PartialUpdate),
            (Target::Item, "DELETE") => Some(Operation::Destroy),
            _ => None,
        }
    }

    /// Safe operations never mutate data
    pub fn is_safe(&self) -> bool {
        matches!(self, Operation::List | Operation::Retrieve)
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPolicy {
    /// Public access (no auth required)
    Public,

    /// Any authenticated user
    Authenticated,

    /// Safe operations are public, the rest need an authenticated user
    AuthenticatedOrReadOnly,
}

impl AuthPolicy {
    /// Check if auth context satisfies this policy for an operation
    pub fn check(&self, operation: Operation, context: &AuthContext) -> ApiResult<()> {
        match self {
            AuthPolicy::Public => Ok(()),
            AuthPolicy::AuthenticatedOrReadOnly if operation.is_safe() => Ok(()),
            AuthPolicy::Authenticated | AuthPolicy::AuthenticatedOrReadOnly => match context {
                AuthContext::User { .. } => Ok(()),
                AuthContext::Anonymous => Err(RequestError::NotAuthenticated.into()),
                AuthContext::Rejected { reason } => Err(RequestError::Forbidden {
                    message: reason.clone(),
                }
                .into()),
            },
        }
    }
}

/// One policy per operation of a resource
///
/// Operations missing from a configured table keep their default policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionTable {
    pub list: AuthPolicy,
    pub retrieve: AuthPolicy,
    pub create: AuthPolicy,
    pub update: AuthPolicy,
    pub partial_update: AuthPolicy,
    pub destroy: AuthPolicy,
}

impl PermissionTable {
    /// Anonymous read, authenticated write
    pub const fn read_only_or_authenticated() -> Self {
        Self {
            list: AuthPolicy::Public,
            retrieve: AuthPolicy::Public,
            create: AuthPolicy::Authenticated,
            update: AuthPolicy::Authenticated,
            partial_update: AuthPolicy::Authenticated,
            destroy: AuthPolicy::Authenticated,
        }
    }

    pub fn policy_for(&self, operation: Operation) -> AuthPolicy {
        match operation {
            Operation::List => self.list,
            Operation::Retrieve => self.retrieve,
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::PartialUpdate => self.partial_update,
            Operation::Destroy => self.destroy,
        }
    }

    pub fn authorize(&self, operation: Operation, context: &AuthContext) -> ApiResult<()> {
        self.policy_for(operation).check(operation, context)
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::read_only_or_authenticated()
    }
}

/// Trait for auth providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the auth context of a request from its headers
    async fn authenticate(&self, headers: &HeaderMap) -> StorageResult<AuthContext>;
}

/// Server-stored opaque token authentication.
///
/// Accepts `Authorization: Token <key>` and `Authorization: Bearer <key>`.
/// Any other scheme is ignored, leaving the request anonymous.
pub struct TokenAuthProvider {
    users: Arc<dyn UserService>,
}

impl TokenAuthProvider {
    pub fn new(users: Arc<dyn UserService>) -> Self {
        Self { users }
    }
}

const TOKEN_SCHEMES: [&str; 2] = ["token", "bearer"];

#[async_trait]
impl AuthProvider for TokenAuthProvider {
    async fn authenticate(&self, headers: &HeaderMap) -> StorageResult<AuthContext> {
        let Some(value) = headers.get(header::AUTHORIZATION) else {
            return Ok(AuthContext::Anonymous);
        };

        let Ok(value) = value.to_str() else {
            return Ok(rejected(
                "Invalid token header. Token string should not contain invalid characters.",
            ));
        };

        let mut parts = value.split_whitespace();
        match parts.next() {
            Some(scheme) if TOKEN_SCHEMES.iter().any(|s| scheme.eq_ignore_ascii_case(s)) => {}
            _ => return Ok(AuthContext::Anonymous),
        }

        let key = match (parts.next(), parts.next()) {
            (Some(key), None) => key,
            (None, _) => return Ok(rejected("Invalid token header. No credentials provided.")),
            (Some(_), Some(_)) => {
                return Ok(rejected(
                    "Invalid token header. Token string should not contain spaces.",
                ));
            }
        };

        let Some(token) = self.users.find_token(key).await? else {
            tracing::warn!("Rejected unknown token");
            return Ok(rejected("Invalid token."));
        };

        match self.users.get_user(token.user_id).await? {
            Some(user) if user.is_active => {
                tracing::debug!(user = %user.username, "Authenticated request");
                Ok(AuthContext::User {
                    user_id: user.id,
                    username: user.username,
                })
            }
            _ => {
                tracing::warn!(user_id = token.user_id, "Rejected token of inactive user");
                Ok(rejected("User inactive or deleted."))
            }
        }
    }
}

fn rejected(reason: &str) -> AuthContext {
    AuthContext::Rejected {
        reason: reason.to_string(),
    }
}

/// Hash a password into an argon2 PHC string
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

/// Check a password against a stored PHC string; malformed hashes never match
pub fn verify_password(password_hash: &str, password: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StorageError;
    use crate::entities::{AuthToken, User};
    use axum::http::{HeaderValue, StatusCode};
    use chrono::Utc;

    fn user() -> AuthContext {
        AuthContext::User {
            user_id: 1,
            username: "reader".to_string(),
        }
    }

    fn invalid() -> AuthContext {
        AuthContext::Rejected {
            reason: "Invalid token.".to_string(),
        }
    }

    #[test]
    fn test_default_table_allows_reads_for_everyone() {
        let table = PermissionTable::default();
        for context in [AuthContext::Anonymous, invalid(), user()] {
            assert!(table.authorize(Operation::List, &context).is_ok());
            assert!(table.authorize(Operation::Retrieve, &context).is_ok());
        }
    }

    #[test]
    fn test_default_table_writes_need_a_user() {
        let table = PermissionTable::default();
        for op in [
            Operation::Create,
            Operation::Update,
            Operation::PartialUpdate,
            Operation::Destroy,
        ] {
            let err = table.authorize(op, &AuthContext::Anonymous).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

            let err = table.authorize(op, &invalid()).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

            assert!(table.authorize(op, &user()).is_ok());
        }
    }

    #[test]
    fn test_authenticated_or_read_only() {
        let policy = AuthPolicy::AuthenticatedOrReadOnly;
        assert!(policy.check(Operation::List, &AuthContext::Anonymous).is_ok());
        assert!(policy.check(Operation::Create, &AuthContext::Anonymous).is_err());
        assert!(policy.check(Operation::Create, &user()).is_ok());
    }

    #[test]
    fn test_authenticated_reads_reject_anonymous() {
        let table = PermissionTable {
            list: AuthPolicy::Authenticated,
            retrieve: AuthPolicy::Authenticated,
            ..PermissionTable::default()
        };
        assert!(table.authorize(Operation::List, &AuthContext::Anonymous).is_err());
    }

    #[test]
    fn test_operation_from_method() {
        assert_eq!(
            Operation::from_method(&Method::GET, Target::Collection),
            Some(Operation::List)
        );
        assert_eq!(
            Operation::from_method(&Method::POST, Target::Collection),
            Some(Operation::Create)
        );
        assert_eq!(
            Operation::from_method(&Method::PATCH, Target::Item),
            Some(Operation::PartialUpdate)
        );
        assert_eq!(Operation::from_method(&Method::POST, Target::Item), None);
        assert!(Operation::Retrieve.is_safe());
        assert!(!Operation::Destroy.is_safe());
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse"));
        assert!(!verify_password(&hash, "battery staple"));
        assert!(!verify_password("not-a-hash", "correct horse"));
    }

    /// Single-user stub with one known token
    struct StubUsers {
        active: bool,
    }

    #[async_trait]
    impl UserService for StubUsers {
        async fn create_user(&self, _: &str, _: &str) -> StorageResult<User> {
            Err(StorageError::backend("stub", "read only"))
        }

        async fn get_user(&self, id: i64) -> StorageResult<Option<User>> {
            Ok((id == 1).then(|| User {
                id: 1,
                username: "reader".to_string(),
                password_hash: String::new(),
                is_active: self.active,
                date_joined: Utc::now(),
            }))
        }

        async fn find_user_by_username(&self, _: &str) -> StorageResult<Option<User>> {
            Ok(None)
        }

        async fn get_or_create_token(&self, user_id: i64) -> StorageResult<AuthToken> {
            Ok(AuthToken::generate(user_id))
        }

        async fn find_token(&self, key: &str) -> StorageResult<Option<AuthToken>> {
            Ok((key == "good").then(|| AuthToken {
                key: key.to_string(),
                user_id: 1,
                created: Utc::now(),
            }))
        }
    }

    async fn resolve(header: Option<&str>, active: bool) -> AuthContext {
        let provider = TokenAuthProvider::new(Arc::new(StubUsers { active }));
        let mut headers = HeaderMap::new();
        if let Some(value) = header {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        provider.authenticate(&headers).await.unwrap()
    }

    #[tokio::test]
    async fn test_token_resolution() {
        assert_eq!(resolve(None, true).await, AuthContext::Anonymous);
        assert_eq!(resolve(Some("Basic abc"), true).await, AuthContext::Anonymous);
        assert_eq!(resolve(Some("Token good"), true).await, user());
        assert_eq!(resolve(Some("Bearer good"), true).await, user());
        assert_eq!(resolve(Some("Token bad"), true).await, invalid());
        assert!(matches!(
            resolve(Some("Token"), true).await,
            AuthContext::Rejected { .. }
        ));
        assert!(matches!(
            resolve(Some("Token good extra"), true).await,
            AuthContext::Rejected { .. }
        ));
    }

    #[tokio::test]
    async fn test_inactive_user_is_rejected() {
        assert!(matches!(
            resolve(Some("Token good"), false).await,
            AuthContext::Rejected { .. }
        ));
    }
}
