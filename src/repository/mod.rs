pub mod database;
pub mod in_memory;

pub use database::LibsqlRepository;
pub use in_memory::{InMemoryRepository, RepositoryCall};

use crate::context::Context;
use crate::domain::Post;
use crate::error::Result;
use async_trait::async_trait;

/// Reference schema for the tables the importer reads and writes. The
/// importer never runs it; hosts own their migrations.
pub const SCHEMA_SQL: &str = include_str!("../../migrations/001_create_post_and_users.sql");

/// Persistence operations the importer needs from the post store.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn user_exists(&self, ctx: &Context, user_id: &str) -> Result<bool>;

    async fn find_by_title(&self, ctx: &Context, title: &str) -> Result<Option<Post>>;

    async fn find_by_id(&self, ctx: &Context, id: &str) -> Result<Option<Post>>;

    /// Insert `post`; fills in the assigned `id` and `created_at`.
    async fn create(&self, ctx: &Context, post: &mut Post) -> Result<()>;

    async fn update(&self, ctx: &Context, id: &str, post: &Post) -> Result<()>;
}
