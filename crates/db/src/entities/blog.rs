//! Blog post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Publication status of a blog post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum BlogStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "archived")]
    Archived,
}

impl Default for BlogStatus {
    fn default() -> Self {
        Self::Published
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blog")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Derived from content when the author leaves it empty
    pub excerpt: String,

    /// Derived from the excerpt
    pub meta_description: String,

    /// Derived from the title
    #[sea_orm(indexed)]
    pub slug: String,

    pub read_time_minutes: i32,

    #[sea_orm(indexed)]
    pub author_id: String,

    #[sea_orm(indexed)]
    pub category_id: String,

    #[sea_orm(nullable)]
    pub image_url: Option<String>,

    pub status: BlogStatus,

    #[sea_orm(default_value = 0)]
    pub views: i64,

    /// Number of `blog_like` rows (denormalized)
    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    /// Number of live comments (denormalized)
    #[sea_orm(default_value = 0)]
    pub comment_count: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id"
    )]
    Author,

    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,

    #[sea_orm(has_many = "super::blog_tag::Entity")]
    BlogTag,

    #[sea_orm(has_many = "super::blog_like::Entity")]
    BlogLike,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::blog_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BlogTag.def()
    }
}

impl Related<super::blog_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BlogLike.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
