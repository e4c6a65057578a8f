//! Request-scoped cancellation
//!
//! Every request handed to a provider, resource or data source carries a
//! [`Context`]. Contexts created from the same root share one cancellation
//! signal, which `StopProvider` fires so long-running calls can bail out.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done_tx,
            }),
        }
    }

    /// Derives a context that is cancelled when this one is, or once
    /// `timeout` has elapsed, whichever comes first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let (done_tx, _) = watch::channel(self.is_cancelled());
        let child_tx = done_tx.clone();
        let mut parent = self.done();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline.into()) => {}
                Ok(_) = parent.wait_for(|cancelled| *cancelled) => {}
            }
            child_tx.send_replace(true);
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done_tx.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Returns a receiver that flips to `true` once the context is cancelled
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done_tx.subscribe()
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut done = self.done();
        let _ = done.wait_for(|cancelled| *cancelled).await;
    }

    pub fn cancel(&self) {
        self.inner.done_tx.send_replace(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(50));

        assert!(!ctx.is_cancelled());
        sleep(Duration::from_millis(120)).await;
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn context_manual_cancel_is_shared_by_clones() {
        let ctx = Context::new();
        let clone = ctx.clone();

        assert!(!clone.is_cancelled());
        ctx.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn child_context_follows_parent_cancellation() {
        let parent = Context::new();
        let child = parent.with_timeout(Duration::from_secs(60));

        parent.cancel();
        tokio::time::timeout(Duration::from_secs(1), child.cancelled())
            .await
            .unwrap();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn context_deadline() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());

        let ctx_with_timeout = ctx.with_timeout(Duration::from_secs(1));
        assert!(ctx_with_timeout.deadline().is_some());
    }
}
