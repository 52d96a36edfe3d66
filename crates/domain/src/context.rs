//! Cancellation and deadline propagation for a single logical operation.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{DomainError, Result};

/// Carries a cancellation signal and an optional deadline from the caller
/// down into every storage call.
///
/// Contexts are cheap to clone; clones share the same token. Storage futures
/// passed to [`RequestContext::run`] are dropped, and therefore aborted, as
/// soon as either signal fires.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline_at(Instant::now() + timeout)
    }

    /// Tightens the deadline. A later deadline than the current one is ignored.
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// A context cancelled together with this one, but which can also be
    /// cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fails fast if the context is already cancelled or past its deadline.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(DomainError::Canceled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(DomainError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Runs `operation` unless the context fires first.
    ///
    /// Cancellation wins over the deadline, and both win over an operation
    /// that completes in the same poll.
    pub async fn run<T, E, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: Into<DomainError>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(DomainError::Canceled),
            () = deadline => Err(DomainError::DeadlineExceeded),
            result = operation => result.map_err(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use persistence::StoreError;

    use super::*;

    async fn ok_after(delay: Duration) -> std::result::Result<u32, StoreError> {
        tokio::time::sleep(delay).await;
        Ok(7)
    }

    #[tokio::test]
    async fn runs_operation_to_completion() {
        let ctx = RequestContext::new();
        assert_eq!(ctx.run(ok_after(Duration::ZERO)).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn cancelled_context_never_starts_the_operation() {
        let ctx = RequestContext::new();
        ctx.cancel();

        let started = Arc::new(AtomicBool::new(false));
        let flag = started.clone();
        let result = ctx
            .run(async move {
                flag.store(true, Ordering::SeqCst);
                Ok::<_, StoreError>(())
            })
            .await;

        assert!(matches!(result, Err(DomainError::Canceled)));
        assert!(!started.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_in_flight_operation() {
        let ctx = RequestContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = ctx.run(ok_after(Duration::from_secs(60))).await;
        assert!(matches!(result, Err(DomainError::Canceled)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_slow_operation() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(50));
        let result = ctx.run(ok_after(Duration::from_secs(60))).await;
        assert!(matches!(result, Err(DomainError::DeadlineExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_fails_fast() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(matches!(ctx.check(), Err(DomainError::DeadlineExceeded)));
    }

    #[test]
    fn deadline_only_tightens() {
        let now = Instant::now();
        let ctx = RequestContext::new()
            .deadline_at(now + Duration::from_secs(1))
            .deadline_at(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn child_is_cancelled_with_parent() {
        let parent = RequestContext::new();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());

        let parent = RequestContext::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn store_errors_convert_on_the_way_out() {
        let ctx = RequestContext::new();
        let result = ctx
            .run(async { Err::<(), _>(StoreError::Conflict("taken".to_string())) })
            .await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }
}
