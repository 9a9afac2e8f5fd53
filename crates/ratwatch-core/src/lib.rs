//! Liveness and alert derivation engine for the ratwatch sensor dashboard.
//!
//! A rodent-detection rig publishes its current status message and sensor
//! type to a realtime push channel and appends event records to a document
//! store. This crate turns those feeds into dashboard state:
//!
//! - **Liveness**: the device is online while the last update is at most
//!   20 seconds old, re-checked every 3 seconds
//! - **Alert state**: any message other than the standby sentinels is an
//!   active alert; new alerts raise exactly one local notification
//! - **Logs**: the newest 10 records, refreshed every 5 seconds
//!
//! All backends sit behind traits ([`PushChannel`], [`DocumentStore`],
//! [`Notifier`]). The `firebase` feature (on by default) provides REST
//! implementations; [`mock`] provides in-memory ones for tests.
//!
//! # Quick Start
//!
//! ```no_run
//! use ratwatch_core::firebase::{FirebaseConfig, Firestore, RealtimeDatabase};
//! use ratwatch_core::{Dashboard, DashboardConfig, NullNotifier};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let firebase = FirebaseConfig::new("https://example.firebaseio.com", "example");
//!     let handle = Dashboard::new(
//!         RealtimeDatabase::new(&firebase)?,
//!         Firestore::new(&firebase)?,
//!         NullNotifier,
//!         DashboardConfig::default(),
//!     )
//!     .start()?;
//!
//!     let mut states = handle.subscribe_state();
//!     while states.changed().await.is_ok() {
//!         let state = states.borrow().clone();
//!         println!("{} / {}", state.liveness(), state.alert_state());
//!     }
//!     Ok(())
//! }
//! ```

pub mod alert;
pub mod clock;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod liveness;
pub mod logs;
pub mod mock;
pub mod notify;
pub mod retry;
pub mod state;
pub mod subscription;
pub mod traits;

#[cfg(feature = "firebase")]
pub mod firebase;

pub use alert::{AlertTracker, AlertTransition, NotifyPolicy};
pub use clock::{Clock, TokioClock};
pub use dashboard::{
    DEFAULT_COMMAND_PATH, DEFAULT_MESSAGE_PATH, DEFAULT_SENSOR_TYPE_PATH, Dashboard,
    DashboardConfig, DashboardHandle, DashboardPaths,
};
pub use error::{Error, Result};
pub use events::{DashboardEvent, EventDispatcher, EventReceiver, EventSender};
pub use liveness::{LivenessConfig, LivenessEvaluator};
pub use logs::{Document, LogFetcher, LogQuery, normalize};
pub use mock::{MockDocumentStore, MockNotifier, MockPushChannel};
pub use notify::{DispatchOutcome, Notification, NotificationDispatcher, NullNotifier};
pub use retry::{Backoff, RetryConfig, with_retry};
pub use state::{DashboardState, NoteSource, StateChange, StatusNote};
pub use subscription::{Snapshot, SnapshotResult, Subscription};
pub use traits::{DocumentStore, Notifier, PushChannel};

// Re-export types for convenience
pub use ratwatch_types;
pub use ratwatch_types::{AlertState, Liveness, LogEntry, SensorKind, SensorReading};

/// Write `value` to `path`, retrying transient failures.
///
/// This is the dashboard's test command: it overwrites whatever the path
/// held before.
pub async fn send_command<C: PushChannel + ?Sized>(
    channel: &C,
    path: &str,
    value: &str,
    retry: &RetryConfig,
) -> Result<()> {
    with_retry(retry, "send_command", || channel.write(path, value)).await?;
    tracing::info!(path, value, "Command sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_command_overwrites() {
        let channel = MockPushChannel::new();
        let retry = RetryConfig::for_write()
            .jitter(false)
            .initial_delay(std::time::Duration::from_millis(1));
        send_command(&channel, DEFAULT_COMMAND_PATH, "test", &retry)
            .await
            .unwrap();
        send_command(&channel, DEFAULT_COMMAND_PATH, "again", &retry)
            .await
            .unwrap();
        assert_eq!(channel.value(DEFAULT_COMMAND_PATH).as_deref(), Some("again"));
    }

    #[tokio::test]
    async fn test_send_command_retries_transient_failure() {
        let channel = MockPushChannel::new();
        channel.fail_next_writes(1);
        let retry = RetryConfig::for_write()
            .jitter(false)
            .initial_delay(std::time::Duration::from_millis(1));
        send_command(&channel, "cmd", "test", &retry).await.unwrap();
        assert_eq!(channel.writes().len(), 1);
    }
}
