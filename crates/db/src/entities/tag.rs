//! Tag entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tag")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Lowercase tag name
    #[sea_orm(unique)]
    pub name: String,

    #[sea_orm(indexed)]
    pub slug: String,

    pub color: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    /// Number of blog posts carrying this tag (denormalized)
    #[sea_orm(default_value = 0)]
    pub blog_count: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::blog_tag::Entity")]
    BlogTag,
}

impl Related<super::blog_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BlogTag.def()
    }
}

impl Related<super::blog::Entity> for Entity {
    fn to() -> RelationDef {
        super::blog_tag::Relation::Blog.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::blog_tag::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
