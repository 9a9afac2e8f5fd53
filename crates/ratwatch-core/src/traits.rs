//! Trait abstractions for the dashboard backends.
//!
//! The derivation engine never talks to a concrete backend. It is handed
//! implementations of these traits: the Firebase REST clients in
//! [`crate::firebase`], the in-memory mocks in [`crate::mock`], or anything
//! else that can deliver the same contracts.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::logs::{Document, LogQuery};
use crate::notify::Notification;
use crate::subscription::Subscription;

/// Realtime key-value channel delivering full-value change notifications.
///
/// # Example
///
/// ```ignore
/// use ratwatch_core::PushChannel;
///
/// async fn print_changes<C: PushChannel>(channel: &C) -> ratwatch_core::Result<()> {
///     let mut sub = channel.subscribe("SensorStatus/message").await?;
///     while let Some(Ok(snapshot)) = sub.recv().await {
///         println!("{}", snapshot.text());
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Subscribe to a path.
    ///
    /// The subscription first delivers the current value, then every
    /// subsequent value. Dropping it releases the listener.
    async fn subscribe(&self, path: &str) -> Result<Subscription>;

    /// Overwrite the scalar at `path` with `value`.
    async fn write(&self, path: &str, value: &str) -> Result<()>;
}

/// Query service returning ordered sets of structured records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a collection query.
    ///
    /// Implementations honour the ordering and limit in `query`; the log
    /// fetcher still normalises whatever comes back.
    async fn query(&self, query: &LogQuery) -> Result<Vec<Document>>;
}

/// Local notification scheduler.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Whether this platform can show notifications at all.
    ///
    /// When `false` every dispatch is a no-op.
    fn is_supported(&self) -> bool;

    /// Ask for permission to show notifications. Returns whether it was granted.
    ///
    /// Called once at startup.
    async fn request_permission(&self) -> Result<bool> {
        Ok(true)
    }

    /// Deliver a notification immediately.
    async fn schedule(&self, notification: &Notification) -> Result<()>;
}

#[async_trait]
impl<T: PushChannel + ?Sized> PushChannel for Arc<T> {
    async fn subscribe(&self, path: &str) -> Result<Subscription> {
        (**self).subscribe(path).await
    }

    async fn write(&self, path: &str, value: &str) -> Result<()> {
        (**self).write(path, value).await
    }
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn query(&self, query: &LogQuery) -> Result<Vec<Document>> {
        (**self).query(query).await
    }
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    async fn request_permission(&self) -> Result<bool> {
        (**self).request_permission().await
    }

    async fn schedule(&self, notification: &Notification) -> Result<()> {
        (**self).schedule(notification).await
    }
}
