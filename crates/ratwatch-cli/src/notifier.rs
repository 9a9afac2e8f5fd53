//! Desktop notification backend.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use ratwatch_core::{Notification, Notifier, NullNotifier};

/// Application name shown by the notification daemon.
pub const APP_NAME: &str = "ratwatch";

/// Shows alerts through the platform notification service.
#[cfg(feature = "notifications")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

#[cfg(feature = "notifications")]
#[async_trait]
impl Notifier for DesktopNotifier {
    fn is_supported(&self) -> bool {
        true
    }

    async fn schedule(&self, notification: &Notification) -> ratwatch_core::Result<()> {
        let title = notification.title.clone();
        let body = notification.body.clone();

        // `show` talks to D-Bus / the OS synchronously.
        let shown = tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new()
                .summary(&title)
                .body(&body)
                .appname(APP_NAME)
                .show()
                .map(|_| ())
        })
        .await
        .map_err(|e| ratwatch_core::Error::Notification(e.to_string()))?;

        shown.map_err(|e| ratwatch_core::Error::Notification(e.to_string()))?;
        debug!(title = %notification.title, "Desktop notification shown");
        Ok(())
    }
}

/// Pick the notifier for this build and configuration.
///
/// Without the `notifications` feature, or with notifications disabled,
/// alerts are only shown in the terminal.
pub fn notifier(enabled: bool) -> Arc<dyn Notifier> {
    #[cfg(feature = "notifications")]
    if enabled {
        return Arc::new(DesktopNotifier);
    }

    if enabled {
        debug!("Built without desktop notification support");
    }
    Arc::new(NullNotifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_is_unsupported() {
        assert!(!notifier(false).is_supported());
    }

    #[cfg(feature = "notifications")]
    #[test]
    fn test_enabled_uses_desktop() {
        assert!(notifier(true).is_supported());
    }
}
