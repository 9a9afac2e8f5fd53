//! Local notification dispatch for alert transitions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ratwatch_types::SensorKind;

use crate::error::Result;
use crate::traits::Notifier;

/// A notification ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
}

impl Notification {
    /// Create a notification.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Build the notification for an active alert.
    ///
    /// ```
    /// use ratwatch_core::Notification;
    ///
    /// let n = Notification::for_alert("motion", "Rat seen");
    /// assert_eq!(n.title, "Rat Detected!");
    /// assert_eq!(n.body, "MOTION: Rat seen");
    /// ```
    pub fn for_alert(sensor_type: &str, message: &str) -> Self {
        let title = SensorKind::from_sensor_type(sensor_type).notification_title();
        let body = if sensor_type.is_empty() {
            message.to_string()
        } else {
            format!("{}: {}", sensor_type.to_uppercase(), message)
        };
        Self::new(title, body)
    }
}

/// What happened to a dispatched notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handed to the scheduler.
    Delivered,
    /// The platform cannot show notifications.
    Unsupported,
    /// The user did not grant permission.
    PermissionDenied,
    /// The scheduler reported an error.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permission {
    Unknown,
    Granted,
    Denied,
}

/// Dispatches alert notifications through a [`Notifier`].
///
/// Permission is requested once, either explicitly with
/// [`init`](Self::init) or lazily on the first dispatch. Failures never
/// propagate.
#[derive(Debug)]
pub struct NotificationDispatcher<N> {
    notifier: N,
    permission: Permission,
}

impl<N: Notifier> NotificationDispatcher<N> {
    /// Create a dispatcher. Permission has not been requested yet.
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            permission: Permission::Unknown,
        }
    }

    /// Request permission if that has not happened yet.
    ///
    /// Returns whether notifications can be shown.
    pub async fn init(&mut self) -> bool {
        if !self.notifier.is_supported() {
            debug!("Notifications not supported on this platform");
            return false;
        }
        if self.permission == Permission::Unknown {
            self.permission = match self.notifier.request_permission().await {
                Ok(true) => {
                    info!("Notification permission granted");
                    Permission::Granted
                }
                Ok(false) => {
                    debug!("Notification permission denied");
                    Permission::Denied
                }
                Err(e) => {
                    warn!(error = %e, "Failed to request notification permission");
                    Permission::Denied
                }
            };
        }
        self.permission == Permission::Granted
    }

    /// Whether permission has been granted.
    pub fn is_permitted(&self) -> bool {
        self.permission == Permission::Granted
    }

    /// Show the notification for an active alert.
    pub async fn dispatch(&mut self, sensor_type: &str, message: &str) -> DispatchOutcome {
        if !self.notifier.is_supported() {
            return DispatchOutcome::Unsupported;
        }
        if !self.init().await {
            debug!(message, "Dropping notification without permission");
            return DispatchOutcome::PermissionDenied;
        }

        let notification = Notification::for_alert(sensor_type, message);
        match self.notifier.schedule(&notification).await {
            Ok(()) => {
                debug!(title = %notification.title, body = %notification.body, "Notification sent");
                DispatchOutcome::Delivered
            }
            Err(e) => {
                warn!(error = %e, "Failed to send notification");
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Notifier for platforms without notification support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    fn is_supported(&self) -> bool {
        false
    }

    async fn schedule(&self, _notification: &Notification) -> Result<()> {
        Ok(())
    }
}
