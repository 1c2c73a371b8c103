//! Account registration and login.

use std::sync::atomic::Ordering;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, FixedOffset};
use inkpost_common::{AppError, AppResult, IdGenerator, get_metrics};
use inkpost_db::{
    entities::user::{self, UserRole},
    repositories::UserRepository,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::identity::Caller;

/// Input for registering an account.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(length(min = 2, max = 50))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

/// Input for logging in.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// Public profile of an account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub last_login: Option<DateTime<FixedOffset>>,
    pub login_count: i32,
    pub created_at: DateTime<FixedOffset>,
}

impl From<user::Model> for UserView {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            avatar_url: u.avatar_url,
            bio: u.bio,
            is_verified: u.is_verified,
            last_login: u.last_login,
            login_count: u.login_count,
            created_at: u.created_at,
        }
    }
}

/// A freshly issued credential and the account it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserView,
}

/// Service issuing and checking credentials.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account and return its first credential.
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthSession> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let token = self.id_gen.generate_token();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(UserRole::User),
            token: Set(Some(token.clone())),
            avatar_url: Set(None),
            bio: Set(None),
            is_verified: Set(false),
            last_login: Set(None),
            login_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        get_metrics().users_registered.fetch_add(1, Ordering::Relaxed);
        tracing::info!(user_id = %user.id, "Registered user");

        Ok(AuthSession {
            token,
            user: user.into(),
        })
    }

    /// Check an email/password pair and issue a new credential.
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthSession> {
        input.validate()?;

        let user = self
            .user_repo
            .find_by_email(&input.email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&input.password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "Rejected login");
            return Err(AppError::Unauthorized);
        }

        let token = self.id_gen.generate_token();
        self.user_repo.record_login(&user.id, &token).await?;

        let mut view = UserView::from(user);
        view.last_login = Some(chrono::Utc::now().into());
        view.login_count += 1;

        Ok(AuthSession { token, user: view })
    }

    /// Profile of the caller.
    pub async fn me(&self, caller: &Caller) -> AppResult<UserView> {
        Ok(self.user_repo.get_by_id(&caller.id).await?.into())
    }
}

/// Hash a password using Argon2.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
