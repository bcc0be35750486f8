pub mod devto;

use crate::context::Context;
use crate::error::Result;
use crate::types::NormalizedPost;

/// Core trait that every import source must implement.
#[async_trait::async_trait]
pub trait Engine: Send + Sync {
    /// Unique identifier for this source (e.g. "devto").
    fn name(&self) -> &str;

    /// Fetch every post published by `username`. An empty list is not an error.
    async fn fetch_by_username(&self, ctx: &Context, username: &str) -> Result<Vec<NormalizedPost>>;

    /// Fetch one post by its source-native id.
    async fn fetch_by_id(&self, ctx: &Context, id: &str) -> Result<NormalizedPost>;

    /// Fetch one post from its public URL.
    async fn fetch_by_url(&self, ctx: &Context, url: &str) -> Result<NormalizedPost>;
}
