//! Cancellation and deadline propagation for import calls.
//!
//! A [`Context`] is handed down from the driver to every suspension point:
//! each upstream HTTP request and each repository call runs through
//! [`Context::run`], which gives up as soon as the token is cancelled or the
//! deadline passes.

use crate::error::{ImportError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derive a child whose deadline is at most `timeout` from now.
    /// Cancelling the parent cancels the child, not the other way round.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Derive a child that can be cancelled independently of the parent.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// The reason this context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<ImportError> {
        if self.token.is_cancelled() {
            return Some(ImportError::Cancelled("context cancelled".into()));
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => {
                Some(ImportError::Cancelled("context deadline exceeded".into()))
            }
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Drive `fut` to completion unless the context finishes first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ImportError::Cancelled("context cancelled".into())),
            _ = expired => Err(ImportError::Cancelled("context deadline exceeded".into())),
            // A failure racing the deadline reports the deadline.
            res = fut => res.map_err(|e| self.err().unwrap_or(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn background_runs_to_completion() {
        let ctx = Context::background();
        let out = ctx.run(async { Ok::<_, ImportError>(42) }).await.unwrap();
        assert_eq!(out, 42);
        assert!(!ctx.is_done());
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let ctx = Context::background();
        ctx.cancel();
        let err = ctx
            .run(async { Ok::<_, ImportError>(()) })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn deadline_interrupts_pending_future() {
        let ctx = Context::background().with_timeout(Duration::from_millis(20));
        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ImportError>(())
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ImportError::Cancelled("context deadline exceeded".into())
        );
    }

    #[test]
    fn child_deadline_never_extends_parent() {
        let parent = Context::background().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[test]
    fn parent_cancel_reaches_child() {
        let parent = Context::background();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_done());

        let parent = Context::background();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_done());
    }
}
