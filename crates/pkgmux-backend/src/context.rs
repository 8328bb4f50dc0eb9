use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;

/// Cancellation and deadline scope handed to every backend call.
///
/// Cloning a context shares its cancellation token; [`Context::child`]
/// derives a scope that is cancelled with its parent but can also be
/// cancelled (or given a tighter deadline) on its own.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Child scope whose deadline is the earlier of the parent's and `timeout` from now.
    #[must_use]
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
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

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// # Errors
    /// Returns [`BackendError::Cancelled`] or [`BackendError::Timeout`] when
    /// the scope has already ended.
    pub fn check(&self) -> Result<(), BackendError> {
        if self.token.is_cancelled() {
            Err(BackendError::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Err(BackendError::Timeout)
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Drive `future` until it completes, the context is cancelled, or the
    /// deadline passes, whichever happens first.
    ///
    /// # Errors
    /// Returns the future's own error, [`BackendError::Cancelled`], or
    /// [`BackendError::Timeout`].
    pub async fn run<T, F>(&self, future: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        if self.token.is_cancelled() {
            return Err(BackendError::Cancelled);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = future => result,
            () = self.token.cancelled() => Err(BackendError::Cancelled),
            () = deadline => Err(BackendError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Context;
    use crate::error::BackendError;

    #[tokio::test]
    async fn run_passes_through_completed_future() {
        let ctx = Context::new();

        let value = ctx
            .run(async { Ok::<_, BackendError>(7) })
            .await
            .expect("future should complete");

        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn run_returns_timeout_when_deadline_passes() {
        let ctx = Context::with_timeout(Duration::from_millis(5));

        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, BackendError>(())
            })
            .await;

        assert_eq!(result, Err(BackendError::Timeout));
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn cancelling_parent_cancels_child() {
        let parent = Context::new();
        let child = parent.child();

        let pending = tokio::spawn(async move {
            child
                .run(async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok::<_, BackendError>(())
                })
                .await
        });
        parent.cancel();

        let result = pending.await.expect("task should not panic");
        assert_eq!(result, Err(BackendError::Cancelled));
    }

    #[tokio::test]
    async fn run_refuses_to_start_on_cancelled_context() {
        let ctx = Context::new();
        ctx.cancel();

        let result = ctx.run(async { Ok::<_, BackendError>(1) }).await;

        assert_eq!(result, Err(BackendError::Cancelled));
    }

    #[tokio::test]
    async fn child_with_timeout_keeps_earlier_parent_deadline() {
        let parent = Context::with_timeout(Duration::from_millis(10));
        let child = parent.child_with_timeout(Duration::from_secs(60));

        assert_eq!(child.deadline(), parent.deadline());
        assert!(child.remaining().is_some_and(|r| r <= Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn check_reports_why_the_scope_ended() {
        let live = Context::new();
        assert_eq!(live.check(), Ok(()));

        let expired = Context::with_timeout(Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(expired.check(), Err(BackendError::Timeout));

        live.cancel();
        assert_eq!(live.check(), Err(BackendError::Cancelled));
    }
}
