//! Alert state tracking with edge-triggered transitions.
//!
//! The push channel may redeliver an unchanged message (reconnects, the
//! initial snapshot of a resubscription, a writer that republishes). The
//! [`AlertTracker`] compares each message with the previous one so that an
//! alert notifies once, not once per delivery.

use serde::{Deserialize, Serialize};

use ratwatch_types::AlertState;

/// When an active message should produce a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// Notify when an active message differs from the previous message.
    #[default]
    OnChange,
    /// Notify on every delivery of an active message, even if unchanged.
    EveryUpdate,
}

/// Change reported by [`AlertTracker::observe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertTransition {
    /// A new active message arrived; dispatch a notification.
    Raised {
        /// The active message.
        message: String,
    },
    /// The same active message arrived again under [`NotifyPolicy::EveryUpdate`].
    Repeated {
        /// The active message.
        message: String,
    },
    /// The rig returned to standby.
    Cleared,
}

impl AlertTransition {
    /// Whether this transition should trigger a notification.
    pub fn should_notify(&self) -> bool {
        matches!(
            self,
            AlertTransition::Raised { .. } | AlertTransition::Repeated { .. }
        )
    }
}

/// Tracks the last observed message and derives alert transitions.
#[derive(Debug, Clone, Default)]
pub struct AlertTracker {
    policy: NotifyPolicy,
    last_message: Option<String>,
}

impl AlertTracker {
    /// Create a tracker with the given policy.
    pub fn new(policy: NotifyPolicy) -> Self {
        Self {
            policy,
            last_message: None,
        }
    }

    /// The notify policy in effect.
    pub fn policy(&self) -> NotifyPolicy {
        self.policy
    }

    /// Current alert state, standby until a message has been observed.
    pub fn state(&self) -> AlertState {
        self.last_message
            .as_deref()
            .map(AlertState::from_message)
            .unwrap_or_default()
    }

    /// Record a message and report what changed.
    pub fn observe(&mut self, message: &str) -> Option<AlertTransition> {
        let previous = self.last_message.replace(message.to_string());
        let unchanged = previous.as_deref() == Some(message);
        let was_active = previous
            .as_deref()
            .is_some_and(|m| AlertState::from_message(m).is_active());

        match AlertState::from_message(message) {
            AlertState::Active if !unchanged => Some(AlertTransition::Raised {
                message: message.to_string(),
            }),
            AlertState::Active => match self.policy {
                NotifyPolicy::EveryUpdate => Some(AlertTransition::Repeated {
                    message: message.to_string(),
                }),
                NotifyPolicy::OnChange => None,
            },
            AlertState::Standby if was_active => Some(AlertTransition::Cleared),
            AlertState::Standby => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_standby() {
        let t = AlertTracker::default();
        assert_eq!(t.state(), AlertState::Standby);
        assert_eq!(t.policy(), NotifyPolicy::OnChange);
    }

    #[test]
    fn test_standby_to_active_raises() {
        let mut t = AlertTracker::default();
        assert_eq!(t.observe("Standby"), None);
        assert_eq!(
            t.observe("Rat seen"),
            Some(AlertTransition::Raised {
                message: "Rat seen".into()
            })
        );
        assert_eq!(t.state(), AlertState::Active);
    }

    #[test]
    fn test_first_message_active_raises() {
        let mut t = AlertTracker::default();
        let transition = t.observe("Rat seen").unwrap();
        assert!(transition.should_notify());
    }

    #[test]
    fn test_repeated_active_is_deduplicated() {
        let mut t = AlertTracker::default();
        assert!(t.observe("Rat seen").is_some());
        assert_eq!(t.observe("Rat seen"), None);
        assert_eq!(t.observe("Rat seen"), None);
    }

    #[test]
    fn test_changed_active_message_raises_again() {
        let mut t = AlertTracker::default();
        assert!(t.observe("Rat seen").is_some());
        assert_eq!(
            t.observe("Rat seen near door"),
            Some(AlertTransition::Raised {
                message: "Rat seen near door".into()
            })
        );
    }

    #[test]
    fn test_return_to_standby_clears() {
        let mut t = AlertTracker::default();
        t.observe("Rat seen");
        assert_eq!(t.observe("Standby..."), Some(AlertTransition::Cleared));
        assert_eq!(t.observe("Standby"), None);
        assert!(!AlertTransition::Cleared.should_notify());
    }

    #[test]
    fn test_same_alert_after_standby_raises() {
        let mut t = AlertTracker::default();
        t.observe("Rat seen");
        t.observe("Standby");
        assert!(matches!(
            t.observe("Rat seen"),
            Some(AlertTransition::Raised { .. })
        ));
    }

    #[test]
    fn test_every_update_policy_repeats() {
        let mut t = AlertTracker::new(NotifyPolicy::EveryUpdate);
        assert!(matches!(
            t.observe("Rat seen"),
            Some(AlertTransition::Raised { .. })
        ));
        let again = t.observe("Rat seen").unwrap();
        assert_eq!(
            again,
            AlertTransition::Repeated {
                message: "Rat seen".into()
            }
        );
        assert!(again.should_notify());
    }

    #[test]
    fn test_empty_message_is_standby() {
        let mut t = AlertTracker::default();
        assert_eq!(t.observe(""), None);
        assert_eq!(t.state(), AlertState::Standby);
    }

    #[test]
    fn test_policy_serde() {
        let json = serde_json::to_string(&NotifyPolicy::EveryUpdate).unwrap();
        assert_eq!(json, "\"every_update\"");
        let p: NotifyPolicy = serde_json::from_str("\"on_change\"").unwrap();
        assert_eq!(p, NotifyPolicy::OnChange);
    }
}
