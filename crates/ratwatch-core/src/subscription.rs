//! Scoped push-channel subscriptions.
//!
//! A [`Subscription`] owns the background task that feeds it. Dropping the
//! subscription (or calling [`Subscription::close`]) cancels that task, so a
//! listener can never outlive the view that registered it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Error;

/// Default number of undelivered snapshots buffered per subscription.
pub const DEFAULT_BUFFER: usize = 16;

/// Full value of a subscribed path at one point in time.
///
/// The push channel has no delta semantics: every snapshot replaces the
/// previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Path the value was read from.
    pub path: String,
    /// Scalar value rendered as text, or `None` when the path is empty.
    pub value: Option<String>,
}

impl Snapshot {
    /// Create a snapshot.
    pub fn new(path: impl Into<String>, value: Option<String>) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }

    /// The value, with an absent value read as the empty string.
    pub fn text(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// Result type for subscription items.
pub type SnapshotResult = std::result::Result<Snapshot, Error>;

/// A live subscription to one push-channel path.
pub struct Subscription {
    path: String,
    receiver: mpsc::Receiver<SnapshotResult>,
    handle: tokio::task::JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl Subscription {
    /// Spawn the feeding task and wrap it in a subscription.
    ///
    /// `feed` receives the sending half of the snapshot channel and a
    /// cancellation token it must honour.
    pub fn spawn<F, Fut>(path: impl Into<String>, buffer: usize, feed: F) -> Self
    where
        F: FnOnce(mpsc::Sender<SnapshotResult>, CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let path = path.into();
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let cancel_token = CancellationToken::new();
        let task_token = cancel_token.clone();
        let fut = feed(tx, task_token.clone());
        let task_path = path.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {
                    debug!(path = %task_path, "Subscription cancelled");
                }
                _ = fut => {
                    debug!(path = %task_path, "Subscription feed finished");
                }
            }
        });

        Self {
            path,
            receiver: rx,
            handle,
            cancel_token,
        }
    }

    /// Path this subscription listens to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Receive the next snapshot, or `None` once the feed has ended.
    pub async fn recv(&mut self) -> Option<SnapshotResult> {
        self.receiver.recv().await
    }

    /// Release the subscription and stop its background task.
    pub fn close(self) {
        self.cancel_token.cancel();
    }

    /// Token that cancels this subscription when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Check if the feeding task is still running.
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Check if the subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

impl Stream for Subscription {
    type Item = SnapshotResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_snapshot_text_defaults_to_empty() {
        let snap = Snapshot::new("SensorStatus/message", None);
        assert_eq!(snap.text(), "");

        let snap = Snapshot::new("SensorStatus/message", Some("Rat seen".into()));
        assert_eq!(snap.text(), "Rat seen");
    }

    #[tokio::test]
    async fn test_subscription_delivers_in_order() {
        let mut sub = Subscription::spawn("a", DEFAULT_BUFFER, |tx, _token| async move {
            for v in ["one", "two"] {
                let _ = tx.send(Ok(Snapshot::new("a", Some(v.to_string())))).await;
            }
        });

        assert_eq!(sub.path(), "a");
        let first = sub.next().await.unwrap().unwrap();
        let second = sub.recv().await.unwrap().unwrap();
        assert_eq!(first.text(), "one");
        assert_eq!(second.text(), "two");
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_cancels_feed() {
        let sub = Subscription::spawn("a", DEFAULT_BUFFER, |_tx, token| async move {
            token.cancelled().await;
        });
        let token = sub.cancellation_token();
        assert!(!token.is_cancelled());
        drop(sub);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_close_stops_task() {
        let sub = Subscription::spawn("a", DEFAULT_BUFFER, |_tx, _token| {
            futures::future::pending::<()>()
        });
        let token = sub.cancellation_token();
        assert!(!sub.is_cancelled());
        sub.close();
        assert!(token.is_cancelled());
    }
}
