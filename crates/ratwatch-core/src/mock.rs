//! In-memory backends for testing.
//!
//! These implement the backend traits without any network access, so the
//! dashboard controller can be driven deterministically (together with
//! `tokio::time::pause`) in unit and integration tests.
//!
//! # Features
//!
//! - **Push simulation**: [`MockPushChannel::push`] delivers a value to all
//!   subscribers of a path, including unchanged values.
//! - **Failure injection**: every mock can be told to fail its operations.
//! - **Latency simulation**: [`MockDocumentStore`] can delay its answers.
//! - **Call recording**: writes, queries and notifications are recorded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::logs::{Document, LogQuery};
use crate::notify::Notification;
use crate::subscription::{DEFAULT_BUFFER, Snapshot, Subscription};
use crate::traits::{DocumentStore, Notifier, PushChannel};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone)]
enum PathEvent {
    Value(Option<String>),
    Error(String),
}

#[derive(Debug)]
struct PathState {
    value: Option<String>,
    sender: broadcast::Sender<PathEvent>,
}

impl PathState {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            value: None,
            sender,
        }
    }
}

/// An in-memory push channel.
///
/// # Example
///
/// ```
/// use ratwatch_core::{MockPushChannel, PushChannel};
///
/// #[tokio::main]
/// async fn main() {
///     let channel = MockPushChannel::new();
///     channel.push("SensorStatus/message", Some("Standby"));
///
///     let mut sub = channel.subscribe("SensorStatus/message").await.unwrap();
///     let first = sub.recv().await.unwrap().unwrap();
///     assert_eq!(first.text(), "Standby");
/// }
/// ```
#[derive(Debug, Default)]
pub struct MockPushChannel {
    paths: Mutex<HashMap<String, PathState>>,
    writes: Mutex<Vec<(String, String)>>,
    subscribe_count: AtomicU32,
    fail_subscribe: AtomicBool,
    remaining_write_failures: AtomicU32,
}

impl MockPushChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value at `path` and deliver it to every subscriber.
    ///
    /// Unchanged values are delivered again, as a real backend may do.
    pub fn push(&self, path: &str, value: Option<&str>) {
        let mut paths = lock(&self.paths);
        let state = paths.entry(path.to_string()).or_insert_with(PathState::new);
        state.value = value.map(str::to_string);
        let _ = state.sender.send(PathEvent::Value(state.value.clone()));
    }

    /// Deliver a stream error to every subscriber of `path`.
    pub fn push_error(&self, path: &str, reason: &str) {
        let mut paths = lock(&self.paths);
        let state = paths.entry(path.to_string()).or_insert_with(PathState::new);
        let _ = state.sender.send(PathEvent::Error(reason.to_string()));
    }

    /// Current value at `path`.
    pub fn value(&self, path: &str) -> Option<String> {
        lock(&self.paths).get(path).and_then(|s| s.value.clone())
    }

    /// Number of live listeners on `path`.
    pub fn listener_count(&self, path: &str) -> usize {
        lock(&self.paths)
            .get(path)
            .map_or(0, |s| s.sender.receiver_count())
    }

    /// Number of `subscribe` calls so far.
    pub fn subscribe_count(&self) -> u32 {
        self.subscribe_count.load(Ordering::Relaxed)
    }

    /// Make subsequent `subscribe` calls fail.
    pub fn set_fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::Relaxed);
    }

    /// Fail the next `count` writes with a transient error.
    pub fn fail_next_writes(&self, count: u32) {
        self.remaining_write_failures.store(count, Ordering::Relaxed);
    }

    /// All successful writes, in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        lock(&self.writes).clone()
    }
}

#[async_trait]
impl PushChannel for MockPushChannel {
    async fn subscribe(&self, path: &str) -> Result<Subscription> {
        self.subscribe_count.fetch_add(1, Ordering::Relaxed);
        if self.fail_subscribe.load(Ordering::Relaxed) {
            return Err(Error::channel(path, "Mock subscribe failure"));
        }

        let (initial, mut rx) = {
            let mut paths = lock(&self.paths);
            let state = paths.entry(path.to_string()).or_insert_with(PathState::new);
            (state.value.clone(), state.sender.subscribe())
        };

        let feed_path = path.to_string();
        Ok(Subscription::spawn(path, DEFAULT_BUFFER, move |tx, _cancel| async move {
            if tx
                .send(Ok(Snapshot::new(feed_path.clone(), initial)))
                .await
                .is_err()
            {
                return;
            }
            loop {
                let item = match rx.recv().await {
                    Ok(PathEvent::Value(value)) => Ok(Snapshot::new(feed_path.clone(), value)),
                    Ok(PathEvent::Error(reason)) => Err(Error::channel(&feed_path, reason)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        }))
    }

    async fn write(&self, path: &str, value: &str) -> Result<()> {
        let remaining = self.remaining_write_failures.load(Ordering::Relaxed);
        if remaining > 0 {
            self.remaining_write_failures
                .store(remaining - 1, Ordering::Relaxed);
            return Err(Error::channel(path, "Mock write failure"));
        }
        lock(&self.writes).push((path.to_string(), value.to_string()));
        self.push(path, Some(value));
        Ok(())
    }
}

/// An in-memory document store.
#[derive(Debug, Default)]
pub struct MockDocumentStore {
    documents: Mutex<Vec<Document>>,
    should_fail: AtomicBool,
    latency_ms: AtomicU64,
    query_count: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl MockDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `documents`.
    pub fn with_documents(documents: Vec<Document>) -> Self {
        let store = Self::new();
        store.set_documents(documents);
        store
    }

    /// Replace the stored documents.
    ///
    /// They are returned as stored, in order, regardless of the query.
    pub fn set_documents(&self, documents: Vec<Document>) {
        *lock(&self.documents) = documents;
    }

    /// Make queries fail.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Delay every answer.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(ms, Ordering::Relaxed);
    }

    /// Number of queries started.
    pub fn query_count(&self) -> u32 {
        self.query_count.load(Ordering::Relaxed)
    }

    /// Highest number of queries that were running at the same time.
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::Relaxed)
    }
}

struct InFlight<'a>(&'a AtomicU32);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn query(&self, query: &LogQuery) -> Result<Vec<Document>> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        let running = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.max_in_flight.fetch_max(running, Ordering::Relaxed);
        let _guard = InFlight(&self.in_flight);

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::query(&query.collection, "Mock query failure"));
        }
        Ok(lock(&self.documents).clone())
    }
}

/// A notifier that records what it is asked to show.
#[derive(Debug)]
pub struct MockNotifier {
    supported: AtomicBool,
    permission: AtomicBool,
    should_fail: AtomicBool,
    permission_requests: AtomicU32,
    sent: Mutex<Vec<Notification>>,
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self {
            supported: AtomicBool::new(true),
            permission: AtomicBool::new(true),
            should_fail: AtomicBool::new(false),
            permission_requests: AtomicU32::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl MockNotifier {
    /// Create a supported notifier that grants permission.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a notifier for a platform without notifications.
    pub fn unsupported() -> Self {
        let notifier = Self::new();
        notifier.supported.store(false, Ordering::Relaxed);
        notifier
    }

    /// Set whether permission requests are granted.
    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::Relaxed);
    }

    /// Make scheduling fail.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Number of permission requests received.
    pub fn permission_requests(&self) -> u32 {
        self.permission_requests.load(Ordering::Relaxed)
    }

    /// Notifications scheduled so far.
    pub fn sent(&self) -> Vec<Notification> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn is_supported(&self) -> bool {
        self.supported.load(Ordering::Relaxed)
    }

    async fn request_permission(&self) -> Result<bool> {
        self.permission_requests.fetch_add(1, Ordering::Relaxed);
        Ok(self.permission.load(Ordering::Relaxed))
    }

    async fn schedule(&self, notification: &Notification) -> Result<()> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::Notification("Mock notification failure".into()));
        }
        lock(&self.sent).push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_subscribe_delivers_current_then_updates() {
        let channel = MockPushChannel::new();
        channel.push("a", Some("one"));

        let mut sub = channel.subscribe("a").await.unwrap();
        assert_eq!(sub.recv().await.unwrap().unwrap().text(), "one");

        channel.push("a", Some("two"));
        channel.push("a", Some("two"));
        assert_eq!(sub.recv().await.unwrap().unwrap().text(), "two");
        assert_eq!(sub.recv().await.unwrap().unwrap().text(), "two");
    }

    #[tokio::test]
    async fn test_empty_path_reads_as_empty() {
        let channel = MockPushChannel::new();
        let mut sub = channel.subscribe("missing").await.unwrap();
        let snap = sub.recv().await.unwrap().unwrap();
        assert_eq!(snap.value, None);
        assert_eq!(snap.text(), "");
    }

    #[tokio::test]
    async fn test_push_error_is_delivered() {
        let channel = MockPushChannel::new();
        let mut sub = channel.subscribe("a").await.unwrap();
        let _ = sub.recv().await;
        channel.push_error("a", "stream reset");
        assert!(matches!(sub.recv().await, Some(Err(Error::Channel { .. }))));
    }

    #[tokio::test]
    async fn test_closing_subscription_releases_listener() {
        let channel = MockPushChannel::new();
        let mut sub = channel.subscribe("a").await.unwrap();
        let _ = sub.recv().await;
        assert_eq!(channel.listener_count("a"), 1);

        sub.close();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(channel.listener_count("a"), 0);
    }

    #[tokio::test]
    async fn test_write_records_and_publishes() {
        let channel = MockPushChannel::new();
        channel.write("SensorStatus/command", "test").await.unwrap();
        assert_eq!(
            channel.writes(),
            vec![("SensorStatus/command".to_string(), "test".to_string())]
        );
        assert_eq!(channel.value("SensorStatus/command").as_deref(), Some("test"));
    }

    #[tokio::test]
    async fn test_write_failure_injection() {
        let channel = MockPushChannel::new();
        channel.fail_next_writes(1);
        assert!(channel.write("p", "v").await.is_err());
        assert!(channel.write("p", "v").await.is_ok());
        assert_eq!(channel.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_document_store() {
        let doc = Document::new("a", json!({"sensor": "motion"}).as_object().cloned().unwrap());
        let store = MockDocumentStore::with_documents(vec![doc]);
        let docs = store.query(&LogQuery::default()).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(store.query_count(), 1);

        store.set_should_fail(true);
        assert!(store.query(&LogQuery::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_notifier_records() {
        let notifier = MockNotifier::new();
        assert!(notifier.is_supported());
        assert!(notifier.request_permission().await.unwrap());
        notifier
            .schedule(&Notification::new("t", "b"))
            .await
            .unwrap();
        assert_eq!(notifier.sent().len(), 1);
        assert!(!MockNotifier::unsupported().is_supported());
    }
}
