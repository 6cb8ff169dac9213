//! [`ChangeTracker`]: lets a watching endpoint wake a waiting controller
//! loop (or an external caller polling session status) the moment
//! something changes, without polling (spec §4.5).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Notify;

/// A monotonically increasing change index plus a one-shot termination
/// flag, both observable without holding a lock across an await point.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    index: AtomicU64,
    terminated: AtomicBool,
    notify: Notify,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current change index.
    pub fn index(&self) -> u64 {
        self.index.load(Ordering::Acquire)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Record that something changed and wake every waiter.
    pub fn notify_change(&self) {
        self.index.fetch_add(1, Ordering::AcqRel);
        self.notify.notify_waiters();
    }

    /// Wake every waiter permanently; further waits return `None`
    /// immediately. Irreversible — there is no un-terminate.
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Wait until the index advances past `since`, returning the new
    /// index, or `None` if the tracker is terminated first.
    ///
    /// Subscribes to notifications before re-checking state, so a change
    /// or termination that happens concurrently with the call is never
    /// missed (the classic `Notify` race).
    pub async fn wait_for_change(&self, since: u64) -> Option<u64> {
        loop {
            if self.is_terminated() {
                return None;
            }
            let current = self.index();
            if current > since {
                return Some(current);
            }

            let notified = self.notify.notified();
            tokio::pin!(notified);

            if self.is_terminated() {
                return None;
            }
            let current = self.index();
            if current > since {
                return Some(current);
            }

            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_returns_immediately_if_already_advanced() {
        let tracker = ChangeTracker::new();
        tracker.notify_change();
        let result = tokio::time::timeout(Duration::from_millis(100), tracker.wait_for_change(0)).await;
        assert_eq!(result.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn wait_wakes_on_notify_change() {
        let tracker = Arc::new(ChangeTracker::new());
        let waiter = tokio::spawn({
            let tracker = Arc::clone(&tracker);
            async move { tracker.wait_for_change(0).await }
        });
        tokio::task::yield_now().await;
        tracker.notify_change();
        let result = tokio::time::timeout(Duration::from_millis(200), waiter).await;
        assert_eq!(result.unwrap().unwrap(), Some(1));
    }

    #[tokio::test]
    async fn wait_returns_none_once_terminated() {
        let tracker = ChangeTracker::new();
        tracker.terminate();
        let result = tracker.wait_for_change(0).await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn wait_wakes_on_termination() {
        let tracker = Arc::new(ChangeTracker::new());
        let waiter = tokio::spawn({
            let tracker = Arc::clone(&tracker);
            async move { tracker.wait_for_change(0).await }
        });
        tokio::task::yield_now().await;
        tracker.terminate();
        let result = tokio::time::timeout(Duration::from_millis(200), waiter).await;
        assert_eq!(result.unwrap().unwrap(), None);
    }
}
