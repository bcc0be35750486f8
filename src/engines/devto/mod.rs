//! dev.to import engine.
//!
//! Fetching by username is two-phase: the list endpoint only returns
//! summaries, so every article is fetched again by id to get its body.
//! A failed detail fetch drops that article with a warning instead of
//! failing the whole batch.

pub mod client;
pub mod mapper;

pub use client::{extract_article_id, ClientSettings, DevToArticle, DevToClient};
pub use mapper::{map_post, map_posts};

use crate::constants::DEVTO_ENGINE;
use crate::context::Context;
use crate::engines::Engine;
use crate::error::{ImportError, Result};
use crate::types::NormalizedPost;
use tracing::{info, instrument, warn};

pub struct DevToEngine {
    client: DevToClient,
}

impl Default for DevToEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DevToEngine {
    pub fn new() -> Self {
        Self {
            client: DevToClient::new(),
        }
    }

    pub fn with_client(client: DevToClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Engine for DevToEngine {
    fn name(&self) -> &str {
        DEVTO_ENGINE
    }

    #[instrument(skip(self, ctx))]
    async fn fetch_by_username(&self, ctx: &Context, username: &str) -> Result<Vec<NormalizedPost>> {
        let summaries = self
            .client
            .get_articles_by_username(ctx, username)
            .await
            .map_err(|e| e.context("failed to fetch articles from dev.to"))?;

        if summaries.is_empty() {
            return Ok(Vec::new());
        }

        let mut full_articles = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            match self.client.get_article_by_id(ctx, summary.id).await {
                Ok(article) => full_articles.push(article),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(
                        article_id = summary.id,
                        title = %summary.title,
                        "failed to fetch full details for article, skipping: {}",
                        e
                    );
                }
            }
        }

        info!(
            "Fetched {} of {} articles for {}",
            full_articles.len(),
            summaries.len(),
            username
        );
        Ok(map_posts(&full_articles))
    }

    #[instrument(skip(self, ctx))]
    async fn fetch_by_id(&self, ctx: &Context, id: &str) -> Result<NormalizedPost> {
        let article_id = id
            .trim()
            .parse::<u64>()
            .map_err(|e| ImportError::invalid_argument(format!("invalid article ID {id:?}: {e}")))?;

        let article = self
            .client
            .get_article_by_id(ctx, article_id)
            .await
            .map_err(|e| e.context("failed to fetch article from dev.to"))?;
        Ok(map_post(&article))
    }

    #[instrument(skip(self, ctx))]
    async fn fetch_by_url(&self, ctx: &Context, url: &str) -> Result<NormalizedPost> {
        let article = self
            .client
            .get_article_by_url(ctx, url)
            .await
            .map_err(|e| e.context("failed to fetch article from dev.to"))?;
        Ok(map_post(&article))
    }
}
