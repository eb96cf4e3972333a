//! Request-scoped execution context shared by every feed entry point.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("operation cancelled")]
    Cancelled,
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation token plus optional deadline.
///
/// Cloning shares the token, so cancelling a parent context stops every clone.
#[derive(Debug, Clone, Default)]
pub struct FeedContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl FeedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fails once the context was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(Interrupted::DeadlineExceeded);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_passes() {
        assert_eq!(FeedContext::new().check(), Ok(()));
    }

    #[test]
    fn cancellation_is_shared_with_clones() {
        let ctx = FeedContext::new();
        let child = ctx.clone();
        ctx.cancel();
        assert_eq!(child.check(), Err(Interrupted::Cancelled));
    }

    #[test]
    fn past_deadline_fails() {
        let ctx = FeedContext::new().with_deadline(Instant::now() - Duration::from_millis(1));
        assert_eq!(ctx.check(), Err(Interrupted::DeadlineExceeded));
    }
}
