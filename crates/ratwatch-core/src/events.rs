//! Dashboard event bus.
//!
//! Every change the dashboard controller applies to its state is also
//! published as a [`DashboardEvent`], so front ends and tools can react
//! without diffing state snapshots.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use ratwatch_types::{LogEntry, SensorReading};

use crate::notify::DispatchOutcome;

/// Events emitted by the dashboard controller.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum DashboardEvent {
    /// A live field changed.
    Reading { reading: SensorReading },
    /// Device went from offline to online.
    Online,
    /// Device went from online to offline.
    Offline { silent_for_secs: Option<u64> },
    /// An active alert was raised.
    AlertRaised { sensor_type: String, message: String },
    /// The rig returned to standby.
    AlertCleared,
    /// A notification was dispatched for an alert.
    Notified { delivered: bool, detail: String },
    /// The log list was replaced.
    LogsRefreshed { entries: Vec<LogEntry> },
    /// A log refresh failed; the previous list was kept.
    LogsFailed { error: String },
    /// A push-channel subscription reported an error.
    ChannelError { path: String, error: String },
}

impl DashboardEvent {
    pub(crate) fn notified(outcome: &DispatchOutcome) -> Self {
        let (delivered, detail) = match outcome {
            DispatchOutcome::Delivered => (true, "delivered".to_string()),
            DispatchOutcome::Unsupported => (false, "unsupported".to_string()),
            DispatchOutcome::PermissionDenied => (false, "permission denied".to_string()),
            DispatchOutcome::Failed(e) => (false, e.clone()),
        };
        Self::Notified { delivered, detail }
    }
}

/// Sender for dashboard events.
pub type EventSender = broadcast::Sender<DashboardEvent>;

/// Receiver for dashboard events.
pub type EventReceiver = broadcast::Receiver<DashboardEvent>;

/// Default event channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Fan-out of dashboard events to any number of receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a dispatcher with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: DashboardEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    /// Number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(DashboardEvent::AlertRaised {
            sensor_type: "motion".into(),
            message: "Rat seen".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "alert_raised");
        assert_eq!(json["message"], "Rat seen");

        let json = serde_json::to_value(DashboardEvent::Online).unwrap();
        assert_eq!(json["type"], "online");
    }

    #[tokio::test]
    async fn test_dispatcher_fans_out() {
        let d = EventDispatcher::default();
        let mut a = d.subscribe();
        let mut b = d.subscribe();
        assert_eq!(d.receiver_count(), 2);

        d.send(DashboardEvent::AlertCleared);
        assert!(matches!(a.recv().await.unwrap(), DashboardEvent::AlertCleared));
        assert!(matches!(b.recv().await.unwrap(), DashboardEvent::AlertCleared));
    }

    #[test]
    fn test_send_without_receivers() {
        EventDispatcher::new(4).send(DashboardEvent::Online);
    }
}
