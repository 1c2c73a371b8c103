//! Comment entity.
//!
//! Replies are not stored on their parent; they are looked up by `parent_id`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning blog post
    #[sea_orm(indexed)]
    pub blog_id: String,

    #[sea_orm(indexed)]
    pub author_id: String,

    /// NULL for top-level comments, otherwise a top-level comment on the same post
    #[sea_orm(nullable, indexed)]
    pub parent_id: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Set once the comment is edited, never cleared
    #[sea_orm(default_value = false)]
    pub is_edited: bool,

    #[sea_orm(nullable)]
    pub edited_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::blog::Entity",
        from = "Column::BlogId",
        to = "super::blog::Column::Id"
    )]
    Blog,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id"
    )]
    Author,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,

    #[sea_orm(has_many = "super::comment_like::Entity")]
    CommentLike,
}

impl Related<super::blog::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Blog.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::comment_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CommentLike.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
