//! Caller identity.
//!
//! Every core operation that acts on behalf of someone takes an explicit
//! [`Caller`]. The HTTP layer obtains it from a bearer credential through an
//! [`IdentityResolver`].

use async_trait::async_trait;
use inkpost_common::AppResult;
use inkpost_db::{entities::user::UserRole, repositories::UserRepository};
use serde::Serialize;
use std::sync::Arc;

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl From<UserRole> for Role {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::User => Self::User,
            UserRole::Admin => Self::Admin,
        }
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    #[must_use]
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether the caller may modify a resource owned by `owner_id`.
    #[must_use]
    pub fn can_modify(&self, owner_id: &str) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

/// Resolves a presented credential to a caller.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns `Ok(None)` for unknown credentials.
    async fn resolve_caller(&self, credential: &str) -> AppResult<Option<Caller>>;
}

/// Shared handle to an identity resolver.
pub type SharedIdentityResolver = Arc<dyn IdentityResolver>;

/// Resolves opaque bearer tokens stored on the user row.
#[derive(Clone)]
pub struct TokenIdentityResolver {
    user_repo: UserRepository,
}

impl TokenIdentityResolver {
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }
}

#[async_trait]
impl IdentityResolver for TokenIdentityResolver {
    async fn resolve_caller(&self, credential: &str) -> AppResult<Option<Caller>> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Ok(None);
        }

        Ok(self
            .user_repo
            .find_by_token(credential)
            .await?
            .map(|user| Caller::new(user.id, user.role.into())))
    }
}
