use std::sync::Arc;

use async_trait::async_trait;
use blog_importer::context::Context;
use blog_importer::domain::PostStatus;
use blog_importer::engines::Engine;
use blog_importer::error::{ImportError, Result};
use blog_importer::progress::{CollectingReporter, ProgressEvent};
use blog_importer::registry::EngineRegistry;
use blog_importer::repository::{InMemoryRepository, PostRepository, RepositoryCall};
use blog_importer::service::ImportService;
use blog_importer::types::{ImportOptions, NormalizedPost};

/// Engine that serves a fixed list of posts.
struct ScriptedEngine {
    posts: Vec<NormalizedPost>,
}

fn post(id: u64, title: &str, published_at: Option<&str>) -> NormalizedPost {
    NormalizedPost {
        id: id.to_string(),
        title: title.to_string(),
        content: format!("body of {title}"),
        slug: String::new(),
        url: format!("https://example.test/{id}"),
        source_id: format!("scripted-{id}"),
        published_at: published_at.map(str::to_string),
        updated_at: None,
        tags: vec![],
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_by_username(&self, _ctx: &Context, _username: &str) -> Result<Vec<NormalizedPost>> {
        Ok(self.posts.clone())
    }

    async fn fetch_by_id(&self, _ctx: &Context, id: &str) -> Result<NormalizedPost> {
        self.posts
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ImportError::Upstream {
                status: Some(404),
                message: format!("API returned status 404: no article {id}"),
            })
    }

    async fn fetch_by_url(&self, ctx: &Context, url: &str) -> Result<NormalizedPost> {
        let id = url.rsplit('/').next().unwrap_or_default();
        self.fetch_by_id(ctx, id).await
    }
}

struct Harness {
    registry: Arc<EngineRegistry>,
    repository: Arc<InMemoryRepository>,
}

impl Harness {
    fn new(posts: Vec<NormalizedPost>) -> Self {
        let registry = Arc::new(EngineRegistry::new());
        registry.register(Arc::new(ScriptedEngine { posts }));
        Self {
            registry,
            repository: Arc::new(InMemoryRepository::with_users(["U1"])),
        }
    }

    fn service(&self) -> ImportService {
        ImportService::new(self.registry.clone(), self.repository.clone())
    }
}

fn three_posts() -> Vec<NormalizedPost> {
    vec![
        post(1, "First Post", Some("2024-01-01T00:00:00Z")),
        post(2, "Second Post", Some("2024-01-02T00:00:00Z")),
        post(3, "Third Post", None),
    ]
}

fn by_username(update_existing: bool, dry_run: bool) -> ImportOptions {
    ImportOptions {
        source: "scripted".into(),
        user_id: "U1".into(),
        username: "alice".into(),
        update_existing,
        dry_run,
        ..Default::default()
    }
}

#[tokio::test]
async fn first_import_creates_everything() {
    let harness = Harness::new(three_posts());
    let result = harness
        .service()
        .import(&Context::background(), &by_username(false, false))
        .await
        .unwrap();

    assert_eq!(result.total_fetched, 3);
    assert_eq!((result.created, result.updated, result.skipped, result.failed), (3, 0, 0, 0));

    let stored = harness.repository.posts();
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().all(|p| p.user_id.as_deref() == Some("U1")));
    assert_eq!(stored[0].slug, "first-post");
    assert_eq!(stored[0].status, PostStatus::Published);
    assert_eq!(stored[2].status, PostStatus::Drafted);
    assert!(stored[2].published_at.is_none());
}

#[tokio::test]
async fn rerun_without_update_skips() {
    let harness = Harness::new(three_posts());
    let ctx = Context::background();
    let service = harness.service();

    let first = service.import(&ctx, &by_username(false, false)).await.unwrap();
    assert_eq!((first.created, first.skipped), (3, 0));

    harness.repository.clear_calls();
    let second = service.import(&ctx, &by_username(false, false)).await.unwrap();
    assert_eq!((second.created, second.skipped), (0, 3));
    assert!(!harness
        .repository
        .calls()
        .iter()
        .any(|c| matches!(c, RepositoryCall::Update(_))));
}

#[tokio::test]
async fn rerun_with_update_overwrites() {
    let harness = Harness::new(three_posts());
    let ctx = Context::background();
    let service = harness.service();

    service.import(&ctx, &by_username(true, false)).await.unwrap();
    let second = service.import(&ctx, &by_username(true, false)).await.unwrap();
    assert_eq!((second.created, second.updated), (0, 3));
    assert_eq!(harness.repository.posts().len(), 3);
}

#[tokio::test]
async fn dry_run_issues_no_writes() {
    let harness = Harness::new(three_posts()[..2].to_vec());
    let result = harness
        .service()
        .import(&Context::background(), &by_username(true, true))
        .await
        .unwrap();

    assert_eq!(result.created, 2);
    assert_eq!(harness.repository.write_calls(), 0);
    assert!(harness.repository.posts().is_empty());
    assert!(harness.repository.calls().iter().all(|c| matches!(
        c,
        RepositoryCall::UserExists(_) | RepositoryCall::FindByTitle(_)
    )));
}

#[tokio::test]
async fn dry_run_reports_would_be_updates() {
    let harness = Harness::new(three_posts());
    let ctx = Context::background();
    harness.service().import(&ctx, &by_username(false, false)).await.unwrap();
    harness.repository.clear_calls();

    let skipped = harness.service().import(&ctx, &by_username(false, true)).await.unwrap();
    assert_eq!(skipped.skipped, 3);
    let updated = harness.service().import(&ctx, &by_username(true, true)).await.unwrap();
    assert_eq!(updated.updated, 3);
    assert_eq!(harness.repository.write_calls(), 0);
}

#[tokio::test]
async fn write_failure_is_counted_and_loop_continues() {
    let harness = Harness::new(three_posts());
    harness.repository.fail_writes_for("Second Post");
    let reporter = Arc::new(CollectingReporter::new());

    let result = harness
        .service()
        .with_reporter(reporter.clone())
        .import(&Context::background(), &by_username(false, false))
        .await
        .unwrap();

    assert_eq!((result.created, result.failed), (2, 1));
    assert_eq!(result.processed(), result.total_fetched);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].title, "Second Post");
    assert!(result.errors[0]
        .to_string()
        .starts_with("failed to import 'Second Post': "));

    let events = reporter.events();
    assert!(matches!(events.first(), Some(ProgressEvent::Start { total: 3, .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::Error { .. })));
    assert!(events.contains(&ProgressEvent::Update {
        current: 2,
        message: "Processing: Second Post".into()
    }));
    assert!(matches!(events.last(), Some(ProgressEvent::Finish { message }) if message.contains("1 failed")));
}

#[tokio::test]
async fn unknown_user_aborts_before_fetch() {
    let harness = Harness::new(three_posts());
    let opts = ImportOptions {
        user_id: "UX".into(),
        ..by_username(false, false)
    };

    let abort = harness
        .service()
        .import(&Context::background(), &opts)
        .await
        .unwrap_err();
    assert!(abort.error.is_invalid_argument());
    assert!(abort.error.to_string().contains("does not exist"));
    assert!(abort.partial.is_none());
    assert_eq!(harness.repository.write_calls(), 0);
}

#[tokio::test]
async fn preconditions_are_checked_in_order() {
    let harness = Harness::new(vec![]);
    let ctx = Context::background();

    let unknown = ImportOptions {
        source: "nope".into(),
        user_id: String::new(),
        ..Default::default()
    };
    let err = harness.service().import(&ctx, &unknown).await.unwrap_err().error;
    assert!(err.to_string().contains("unknown engine: nope"));
    assert!(err.to_string().contains("scripted"));

    let no_user = ImportOptions {
        source: "scripted".into(),
        ..Default::default()
    };
    let err = harness.service().import(&ctx, &no_user).await.unwrap_err().error;
    assert!(err.to_string().contains("user_id is required"));

    let no_selector = ImportOptions {
        source: "scripted".into(),
        user_id: "U1".into(),
        ..Default::default()
    };
    let err = harness.service().import(&ctx, &no_selector).await.unwrap_err().error;
    assert!(err.is_invalid_argument());
    assert!(err.to_string().contains("one of username, url, or id"));
}

#[tokio::test]
async fn single_post_selectors() {
    let harness = Harness::new(three_posts());
    let ctx = Context::background();

    let by_id = ImportOptions {
        source: "scripted".into(),
        user_id: "U1".into(),
        article_id: "3".into(),
        ..Default::default()
    };
    let result = harness.service().import(&ctx, &by_id).await.unwrap();
    assert_eq!((result.total_fetched, result.created), (1, 1));
    let stored = harness.repository.find_by_title(&ctx, "Third Post").await.unwrap().unwrap();
    assert_eq!(stored.status, PostStatus::Drafted);
    assert!(stored.published_at.is_none());

    let by_url = ImportOptions {
        source: "scripted".into(),
        user_id: "U1".into(),
        article_url: "https://example.test/1".into(),
        ..Default::default()
    };
    let result = harness.service().import(&ctx, &by_url).await.unwrap();
    assert_eq!(result.created, 1);

    let missing = ImportOptions {
        article_id: "99".into(),
        ..by_id
    };
    let abort = harness.service().import(&ctx, &missing).await.unwrap_err();
    assert_eq!(abort.error.status(), Some(404));
    assert!(abort.error.to_string().contains("failed to fetch post by ID"));
}

#[tokio::test]
async fn cancellation_returns_partial_result() {
    let harness = Harness::new(three_posts());
    let ctx = Context::background();
    harness.repository.cancel_after_next_write(&ctx);
    let reporter = Arc::new(CollectingReporter::new());

    let abort = harness
        .service()
        .with_reporter(reporter.clone())
        .import(&ctx, &by_username(false, false))
        .await
        .unwrap_err();

    assert!(abort.error.is_cancelled());
    let partial = abort.partial.expect("partial result");
    assert_eq!(partial.total_fetched, 3);
    assert_eq!(partial.processed(), 1);
    assert_eq!(partial.created, 1);
    assert_eq!(harness.repository.posts().len(), 1);
    assert!(!reporter
        .events()
        .iter()
        .any(|e| matches!(e, ProgressEvent::Finish { .. })));
}

mod devto_end_to_end {
    use super::*;
    use blog_importer::engines::devto::{ClientSettings, DevToClient, DevToEngine};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn article(id: u64, title: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": title,
            "body_markdown": "body",
            "url": format!("https://dev.to/alice/{id}"),
            "slug": format!("slug-{id}"),
            "published_at": "2024-02-02T08:00:00Z",
            "tag_list": "rust"
        })
    }

    #[tokio::test]
    async fn update_run_ignores_dropped_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/articles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                article(1, "One"),
                article(2, "Two"),
                article(3, "Three")
            ])))
            .mount(&server)
            .await;
        for (id, title) in [(1, "One"), (3, "Three")] {
            Mock::given(method("GET"))
                .and(path(format!("/articles/{id}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(article(id, title)))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/articles/2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let registry = Arc::new(EngineRegistry::new());
        registry.register(Arc::new(DevToEngine::with_client(DevToClient::with_settings(
            ClientSettings {
                base_url: server.uri(),
                request_timeout: Duration::from_secs(5),
            },
        ))));
        let repository = Arc::new(InMemoryRepository::with_users(["U1"]));
        let service = ImportService::new(registry, repository.clone());
        let opts = ImportOptions {
            source: "devto".into(),
            user_id: "U1".into(),
            username: "alice".into(),
            ..Default::default()
        };
        let ctx = Context::background();

        let first = service.import(&ctx, &opts).await.unwrap();
        assert_eq!((first.total_fetched, first.created), (2, 2));

        let opts = ImportOptions {
            update_existing: true,
            ..opts
        };
        let second = service.import(&ctx, &opts).await.unwrap();
        assert_eq!(second.total_fetched, 2);
        assert_eq!(second.updated, 2);
        assert_eq!(second.failed, 0);

        let stored = repository.posts();
        assert_eq!(stored[0].slug, "slug-1");
        assert_eq!(stored[0].status, PostStatus::Published);
    }
}
