//! Live Postgres harness for the `db_integration` tests.
//!
//! Each [`TestDatabase`] owns a throwaway, fully migrated database. Unit
//! tests use `sea_orm::MockDatabase` instead.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::entities::{
    blog::{self, BlogStatus},
    category, comment,
    user::{self, UserRole},
};
use crate::migrations::Migrator;

/// Server credentials, read from `TEST_DB_*` variables.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Role allowed to create databases.
    pub username: String,
    /// Password for `username`.
    pub password: String,
}

impl TestDbConfig {
    /// Read the config, defaulting to the local compose service on port 5433.
    #[must_use]
    pub fn from_env() -> Self {
        let var =
            |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
        Self {
            host: var("TEST_DB_HOST", "localhost"),
            port: var("TEST_DB_PORT", "5433").parse().unwrap_or(5433),
            username: var("TEST_DB_USER", "inkpost_test"),
            password: var("TEST_DB_PASSWORD", "inkpost_test"),
        }
    }

    /// Connection URL for one database on this server.
    #[must_use]
    pub fn url(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{database}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Rows inserted by [`TestDatabase::seed`].
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct Seed {
    pub author: user::Model,
    pub category: category::Model,
    pub blog: blog::Model,
}

/// A migrated database that lives until [`TestDatabase::drop_database`].
pub struct TestDatabase {
    conn: Arc<DatabaseConnection>,
    config: TestDbConfig,
    name: String,
}

impl TestDatabase {
    /// Create a uniquely named database and run every migration on it.
    pub async fn create() -> Result<Self, DbErr> {
        let config = TestDbConfig::from_env();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("inkpost_test_{}", &suffix[..12]);

        let admin = Database::connect(config.url("postgres")).await?;
        admin
            .execute_unprepared(&format!("CREATE DATABASE \"{name}\""))
            .await?;
        admin.close().await?;

        let conn = Database::connect(config.url(&name)).await?;
        Migrator::up(&conn, None).await?;
        info!(database = %name, "Created test database");

        Ok(Self {
            conn: Arc::new(conn),
            config,
            name,
        })
    }

    /// Shared handle for building repositories.
    #[must_use]
    pub fn conn(&self) -> Arc<DatabaseConnection> {
        self.conn.clone()
    }

    /// Insert author `u1`, category `c1` and published post `b1` with zeroed counters.
    pub async fn seed(&self) -> Result<Seed, DbErr> {
        let now = Utc::now();
        let db = self.conn.as_ref();

        let author = user::ActiveModel {
            id: Set("u1".to_string()),
            name: Set("Ada".to_string()),
            email: Set("ada@example.com".to_string()),
            password_hash: Set("hash".to_string()),
            role: Set(UserRole::User),
            token: Set(Some("token-u1".to_string())),
            avatar_url: Set(None),
            bio: Set(None),
            is_verified: Set(false),
            last_login: Set(None),
            login_count: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;

        let category = category::ActiveModel {
            id: Set("c1".to_string()),
            name: Set("Rust".to_string()),
            slug: Set("rust".to_string()),
            color: Set("#3B82F6".to_string()),
            icon: Set("folder".to_string()),
            description: Set(None),
            is_active: Set(true),
            blog_count: Set(1),
            created_at: Set(now.into()),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;

        let body = "Replies nest one level deep.";
        let blog = blog::ActiveModel {
            id: Set("b1".to_string()),
            title: Set("Threads".to_string()),
            content: Set(body.to_string()),
            excerpt: Set(body.to_string()),
            meta_description: Set(body.to_string()),
            slug: Set("threads".to_string()),
            read_time_minutes: Set(1),
            author_id: Set(author.id.clone()),
            category_id: Set(category.id.clone()),
            image_url: Set(None),
            status: Set(BlogStatus::Published),
            views: Set(0),
            like_count: Set(0),
            comment_count: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(None),
        }
        .insert(db)
        .await?;

        Ok(Seed {
            author,
            category,
            blog,
        })
    }

    /// Close every connection and drop the database.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        let Self { conn, config, name } = self;
        // Repositories may still hold clones; the terminate below covers them
        if let Ok(conn) = Arc::try_unwrap(conn) {
            conn.close().await?;
        }

        let admin = Database::connect(config.url("postgres")).await?;
        admin
            .execute_unprepared(&format!(
                "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{name}'"
            ))
            .await
            .ok();
        admin
            .execute_unprepared(&format!("DROP DATABASE IF EXISTS \"{name}\""))
            .await?;
        admin.close().await?;

        info!(database = %name, "Dropped test database");
        Ok(())
    }
}

/// An unsaved comment by `u1`.
#[must_use]
pub fn comment_model(id: &str, blog_id: &str, parent_id: Option<&str>) -> comment::ActiveModel {
    comment::ActiveModel {
        id: Set(id.to_string()),
        blog_id: Set(blog_id.to_string()),
        author_id: Set("u1".to_string()),
        parent_id: Set(parent_id.map(ToString::to_string)),
        content: Set(format!("comment {id}")),
        is_edited: Set(false),
        edited_at: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}
