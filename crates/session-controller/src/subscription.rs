//! Scoped event-subscription lifecycle.
//!
//! Every background listener the controller spawns is tied to a
//! [`SubscriptionGuard`]. Dropping the guard cancels and aborts the task,
//! so a listener can never outlive the component that created it.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owns a spawned listener task and stops it on drop.
#[derive(Debug)]
pub struct SubscriptionGuard {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SubscriptionGuard {
    /// Tie an already-spawned task to the token that stops it.
    #[must_use]
    pub fn new(token: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { token, task }
    }

    /// Stop the listener without waiting for the guard to drop.
    ///
    /// Used during ordered teardown, where listeners must stop before the
    /// session disconnects.
    pub fn cancel(&self) {
        self.token.cancel();
        self.task.abort();
    }

    /// Whether the listener task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.token.cancel();
        self.task.abort();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_task() {
        let token = CancellationToken::new();
        let task = tokio::spawn({
            let token = token.clone();
            async move {
                token.cancelled().await;
            }
        });
        let guard = SubscriptionGuard::new(token, task);
        assert!(guard.is_active());

        drop(guard);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_task_before_drop() {
        let token = CancellationToken::new();
        let task = tokio::spawn({
            let token = token.clone();
            async move {
                token.cancelled().await;
            }
        });
        let guard = SubscriptionGuard::new(token, task);
        guard.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!guard.is_active());
    }
}
