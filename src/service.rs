use crate::context::Context;
use crate::domain::{Post, PostStatus};
use crate::error::{ImportAbort, ImportError, Result};
use crate::metrics::MetricName;
use crate::progress::{NoOpReporter, ProgressReporter};
use crate::registry::EngineRegistry;
use crate::repository::PostRepository;
use crate::slug::{is_valid_slug, slugify};
use crate::types::{FetchMode, ImportAction, ImportOptions, ImportResult, NormalizedPost};
use chrono::{DateTime, Utc};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Runs one import request end to end: validate, fetch from the engine,
/// then create, update or skip each post in fetch order.
pub struct ImportService {
    registry: Arc<EngineRegistry>,
    repository: Arc<dyn PostRepository>,
    reporter: Arc<dyn ProgressReporter>,
}

impl ImportService {
    pub fn new(registry: Arc<EngineRegistry>, repository: Arc<dyn PostRepository>) -> Self {
        Self {
            registry,
            repository,
            reporter: Arc::new(NoOpReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[instrument(skip(self, ctx, opts), fields(source = %opts.source, user_id = %opts.user_id, dry_run = opts.dry_run))]
    pub async fn import(
        &self,
        ctx: &Context,
        opts: &ImportOptions,
    ) -> std::result::Result<ImportResult, ImportAbort> {
        let engine = self.registry.require(&opts.source)?;

        if opts.user_id.is_empty() {
            return Err(ImportError::invalid_argument("user_id is required").into());
        }

        let user_exists = self
            .repository
            .user_exists(ctx, &opts.user_id)
            .await
            .map_err(|e| e.context("failed to validate user"))?;
        if !user_exists {
            return Err(ImportError::invalid_argument(format!(
                "user_id '{}' does not exist",
                opts.user_id
            ))
            .into());
        }

        let mode = opts.fetch_mode().ok_or_else(|| {
            ImportError::invalid_argument("one of username, url, or id must be provided")
        })?;

        let posts = match mode {
            FetchMode::Username(username) => engine
                .fetch_by_username(ctx, username)
                .await
                .map_err(|e| e.context("failed to fetch posts by username"))?,
            FetchMode::Url(url) => vec![engine
                .fetch_by_url(ctx, url)
                .await
                .map_err(|e| e.context("failed to fetch post by URL"))?],
            FetchMode::Id(id) => vec![engine
                .fetch_by_id(ctx, id)
                .await
                .map_err(|e| e.context("failed to fetch post by ID"))?],
        };

        counter!(MetricName::ImportRuns.as_str(), "engine" => opts.source.clone()).increment(1);
        info!("Fetched {} posts from {}", posts.len(), opts.source);

        let mut result = ImportResult::new(posts.len());
        self.reporter.start(
            posts.len(),
            &format!("Importing {} posts from {}", posts.len(), opts.source),
        );

        for (i, post) in posts.iter().enumerate() {
            self.reporter
                .update(i + 1, &format!("Processing: {}", post.title));

            match self.import_post(ctx, post, opts).await {
                Ok(action) => {
                    debug!(title = %post.title, action = action.as_str(), "post imported");
                    result.record(action);
                    self.count(&opts.source, action.as_str());
                }
                Err(e) if e.is_cancelled() => {
                    return Err(ImportAbort::with_partial(e, result));
                }
                Err(e) => {
                    warn!(title = %post.title, "failed to import post: {}", e);
                    self.reporter.error(&e);
                    result.record_failure(&post.title, e);
                    self.count(&opts.source, "failed");
                }
            }

            if let Some(err) = ctx.err() {
                warn!(
                    "Import cancelled after {} of {} posts",
                    result.processed(),
                    result.total_fetched
                );
                return Err(ImportAbort::with_partial(err, result));
            }
        }

        self.reporter.finish(&result.to_string());
        info!("{}", result);
        Ok(result)
    }

    fn count(&self, engine: &str, outcome: &'static str) {
        counter!(
            MetricName::ImportPosts.as_str(),
            "engine" => engine.to_string(),
            "outcome" => outcome
        )
        .increment(1);
    }

    async fn import_post(
        &self,
        ctx: &Context,
        post: &NormalizedPost,
        opts: &ImportOptions,
    ) -> Result<ImportAction> {
        let mut model = to_model(post, &opts.user_id);

        let existing = self
            .repository
            .find_by_title(ctx, &post.title)
            .await
            .map_err(|e| e.context("lookup failed"))?;

        match existing {
            Some(_) if opts.dry_run && opts.update_existing => Ok(ImportAction::Updated),
            Some(_) if opts.dry_run => Ok(ImportAction::Skipped),
            None if opts.dry_run => Ok(ImportAction::Created),
            Some(found) if opts.update_existing => {
                let id = found
                    .id
                    .ok_or_else(|| ImportError::storage("existing post has no id"))?;
                self.repository
                    .update(ctx, &id, &model)
                    .await
                    .map_err(|e| e.context("update failed"))?;
                Ok(ImportAction::Updated)
            }
            Some(_) => Ok(ImportAction::Skipped),
            None => {
                self.repository
                    .create(ctx, &mut model)
                    .await
                    .map_err(|e| e.context("create failed"))?;
                Ok(ImportAction::Created)
            }
        }
    }
}

/// Build the row to persist. A parseable RFC-3339 `published_at` makes the
/// post published; anything else leaves it drafted with no publication time.
pub fn to_model(post: &NormalizedPost, user_id: &str) -> Post {
    let published_at = post
        .published_at
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|ts| ts.with_timezone(&Utc));

    let status = if published_at.is_some() {
        PostStatus::Published
    } else {
        PostStatus::Drafted
    };

    // Source slugs are kept when already valid. Otherwise try the source
    // slug, the title, then the source id, in that order.
    let slug = if is_valid_slug(&post.slug) {
        post.slug.clone()
    } else {
        [&post.slug, &post.title, &post.source_id]
            .into_iter()
            .map(|candidate| slugify(candidate))
            .find(|candidate| !candidate.is_empty())
            .unwrap_or_default()
    };

    Post {
        id: None,
        user_id: Some(user_id.to_string()),
        slug,
        status,
        title: post.title.clone(),
        content: post.content.clone(),
        published_at,
        updated_at: None,
        created_at: None,
    }
}
