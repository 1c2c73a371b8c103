//! Database entities.

#![allow(missing_docs)]

pub mod blog;
pub mod blog_like;
pub mod blog_tag;
pub mod category;
pub mod comment;
pub mod comment_like;
pub mod tag;
pub mod user;

pub use blog::Entity as Blog;
pub use blog_like::Entity as BlogLike;
pub use blog_tag::Entity as BlogTag;
pub use category::Entity as Category;
pub use comment::Entity as Comment;
pub use comment_like::Entity as CommentLike;
pub use tag::Entity as Tag;
pub use user::Entity as User;
