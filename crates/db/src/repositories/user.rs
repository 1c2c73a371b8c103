//! User repository.

use std::sync::Arc;

use crate::entities::{
    User,
    user::{self, UserRole},
};
use super::{like_pattern, write_error};
use inkpost_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, Func},
};

/// Filters for the administrative user listing.
#[derive(Debug, Clone, Default)]
pub struct UserListFilter {
    /// Case-insensitive substring of name or email
    pub search: Option<String>,
    pub role: Option<UserRole>,
}

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User: {id}")))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by email. The lookup is case-insensitive.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by their bearer token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| write_error("User", e))
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| write_error("User", e))
    }

    /// Record a successful login: stamp `last_login` and bump `login_count`.
    pub async fn record_login(&self, id: &str, token: &str) -> AppResult<()> {
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();

        User::update_many()
            .col_expr(user::Column::LastLogin, Expr::value(now))
            .col_expr(
                user::Column::LoginCount,
                Expr::col(user::Column::LoginCount).add(1),
            )
            .col_expr(user::Column::Token, Expr::value(token))
            .filter(user::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Replace a user's token.
    pub async fn set_token(&self, id: &str, token: &str) -> AppResult<()> {
        let model = user::ActiveModel {
            id: Set(id.to_string()),
            token: Set(Some(token.to_string())),
            updated_at: Set(Some(chrono::Utc::now().into())),
            ..Default::default()
        };
        self.update(model).await?;
        Ok(())
    }

    fn filtered(filter: &UserListFilter) -> Condition {
        let mut condition = Condition::all();

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            condition = condition.add(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::Name)))
                            .like(pattern.clone()),
                    )
                    .add(user::Column::Email.like(pattern)),
            );
        }

        if let Some(role) = filter.role {
            condition = condition.add(user::Column::Role.eq(role));
        }

        condition
    }

    /// List users, newest first.
    pub async fn list(
        &self,
        filter: &UserListFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>> {
        User::find()
            .filter(Self::filtered(filter))
            .order_by_desc(user::Column::CreatedAt)
            .order_by_asc(user::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count users matching a filter.
    pub async fn count_filtered(&self, filter: &UserListFilter) -> AppResult<u64> {
        User::find()
            .filter(Self::filtered(filter))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all users.
    pub async fn count(&self) -> AppResult<u64> {
        User::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
