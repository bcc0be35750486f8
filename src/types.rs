use crate::error::ImportError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A source record normalized by an engine, before it becomes a [`crate::domain::Post`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NormalizedPost {
    /// Source-native identifier rendered as text.
    pub id: String,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub url: String,
    /// `"<engine>-<id>"`, unique across sources.
    pub source_id: String,
    /// RFC-3339 text; `None` when the source has no publication time.
    pub published_at: Option<String>,
    pub updated_at: Option<String>,
    pub tags: Vec<String>,
}

/// Input of one import call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub source: String,
    pub user_id: String,
    pub username: String,
    pub article_url: String,
    pub article_id: String,
    pub update_existing: bool,
    pub dry_run: bool,
}

/// Which fetch the selector fields ask for. Priority: username, url, id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode<'a> {
    Username(&'a str),
    Url(&'a str),
    Id(&'a str),
}

impl ImportOptions {
    pub fn fetch_mode(&self) -> Option<FetchMode<'_>> {
        if !self.username.is_empty() {
            Some(FetchMode::Username(&self.username))
        } else if !self.article_url.is_empty() {
            Some(FetchMode::Url(&self.article_url))
        } else if !self.article_id.is_empty() {
            Some(FetchMode::Id(&self.article_id))
        } else {
            None
        }
    }
}

/// What happened to one fetched post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportAction {
    Created,
    Updated,
    Skipped,
}

impl ImportAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportAction::Created => "created",
            ImportAction::Updated => "updated",
            ImportAction::Skipped => "skipped",
        }
    }
}

/// A per-post failure, attached to the title of the post that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    pub title: String,
    pub error: ImportError,
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to import '{}': {}", self.title, self.error)
    }
}

/// Aggregated outcome of one import call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub total_fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<ItemError>,
}

impl ImportResult {
    pub fn new(total_fetched: usize) -> Self {
        Self {
            total_fetched,
            ..Default::default()
        }
    }

    pub fn record(&mut self, action: ImportAction) {
        match action {
            ImportAction::Created => self.created += 1,
            ImportAction::Updated => self.updated += 1,
            ImportAction::Skipped => self.skipped += 1,
        }
    }

    pub fn record_failure(&mut self, title: &str, error: ImportError) {
        self.failed += 1;
        self.errors.push(ItemError {
            title: title.to_string(),
            error,
        });
    }

    /// Posts written (or that would have been written) to storage.
    pub fn success(&self) -> usize {
        self.created + self.updated
    }

    /// Number of fetched posts that reached an outcome.
    pub fn processed(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for ImportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Import completed: {} fetched, {} created, {} updated, {} skipped, {} failed",
            self.total_fetched, self.created, self.updated, self.skipped, self.failed
        )
    }
}
