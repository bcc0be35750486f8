use super::PostRepository;
use crate::context::Context;
use crate::domain::Post;
use crate::error::{ImportError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// One call received by an [`InMemoryRepository`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryCall {
    UserExists(String),
    FindByTitle(String),
    FindById(String),
    Create(String),
    Update(String),
}

impl RepositoryCall {
    pub fn is_write(&self) -> bool {
        matches!(self, RepositoryCall::Create(_) | RepositoryCall::Update(_))
    }
}

#[derive(Default)]
struct State {
    users: HashSet<String>,
    posts: Vec<Post>,
    calls: Vec<RepositoryCall>,
    failing_titles: HashSet<String>,
    cancel_after_write: Option<Context>,
}

/// In-memory post store for development and testing.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let repo = Self::new();
        for user in users {
            repo.add_user(user);
        }
        repo
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_user(&self, user_id: impl Into<String>) {
        self.state().users.insert(user_id.into());
    }

    /// Make every create/update of a post with this title fail.
    pub fn fail_writes_for(&self, title: impl Into<String>) {
        self.state().failing_titles.insert(title.into());
    }

    /// Cancel `ctx` right after the next successful write.
    pub fn cancel_after_next_write(&self, ctx: &Context) {
        self.state().cancel_after_write = Some(ctx.clone());
    }

    pub fn posts(&self) -> Vec<Post> {
        self.state().posts.clone()
    }

    pub fn calls(&self) -> Vec<RepositoryCall> {
        self.state().calls.clone()
    }

    pub fn write_calls(&self) -> usize {
        self.state().calls.iter().filter(|c| c.is_write()).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    fn after_write(state: &mut State) {
        if let Some(ctx) = state.cancel_after_write.take() {
            ctx.cancel();
        }
    }
}

#[async_trait]
impl PostRepository for InMemoryRepository {
    async fn user_exists(&self, ctx: &Context, user_id: &str) -> Result<bool> {
        ctx.run(async {
            let mut state = self.state();
            state.calls.push(RepositoryCall::UserExists(user_id.to_string()));
            Ok(state.users.contains(user_id))
        })
        .await
    }

    async fn find_by_title(&self, ctx: &Context, title: &str) -> Result<Option<Post>> {
        ctx.run(async {
            let mut state = self.state();
            state.calls.push(RepositoryCall::FindByTitle(title.to_string()));
            Ok(state.posts.iter().find(|p| p.title == title).cloned())
        })
        .await
    }

    async fn find_by_id(&self, ctx: &Context, id: &str) -> Result<Option<Post>> {
        ctx.run(async {
            let mut state = self.state();
            state.calls.push(RepositoryCall::FindById(id.to_string()));
            Ok(state
                .posts
                .iter()
                .find(|p| p.id.as_deref() == Some(id))
                .cloned())
        })
        .await
    }

    async fn create(&self, ctx: &Context, post: &mut Post) -> Result<()> {
        ctx.run(async {
            let mut state = self.state();
            state.calls.push(RepositoryCall::Create(post.title.clone()));
            if state.failing_titles.contains(&post.title) {
                return Err(ImportError::storage(format!(
                    "failed to create post: simulated failure for '{}'",
                    post.title
                )));
            }

            let id = Uuid::new_v4().simple().to_string();
            post.id = Some(id.clone());
            post.created_at = Some(Utc::now());
            state.posts.push(post.clone());
            debug!("Created post: {} with id {}", post.title, id);
            Self::after_write(&mut state);
            Ok(())
        })
        .await
    }

    async fn update(&self, ctx: &Context, id: &str, post: &Post) -> Result<()> {
        ctx.run(async {
            let mut state = self.state();
            state.calls.push(RepositoryCall::Update(post.title.clone()));
            if state.failing_titles.contains(&post.title) {
                return Err(ImportError::storage(format!(
                    "failed to update post: simulated failure for '{}'",
                    post.title
                )));
            }

            let existing = state
                .posts
                .iter_mut()
                .find(|p| p.id.as_deref() == Some(id))
                .ok_or_else(|| ImportError::storage(format!("no post with id {id}")))?;

            let created_at = existing.created_at;
            *existing = Post {
                id: Some(id.to_string()),
                created_at,
                updated_at: Some(Utc::now()),
                ..post.clone()
            };
            debug!("Updated post: {} with id {}", post.title, id);
            Self::after_write(&mut state);
            Ok(())
        })
        .await
    }
}
