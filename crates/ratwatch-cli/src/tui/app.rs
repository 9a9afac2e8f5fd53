//! Application state for the TUI dashboard.
//!
//! [`App`] holds the latest [`DashboardState`] snapshot from the controller
//! plus the UI-only state around it: the help overlay, the in-flight test
//! command and a transient status message.

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use ratwatch_core::{DashboardEvent, DashboardState};

use super::input::{Action, handle_key};

/// How long a status message stays in the status bar.
const MESSAGE_TTL: Duration = Duration::from_secs(5);

/// Work the UI asks the runtime to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    /// Write `"test"` to the command path.
    SendTest,
}

/// Main application state for the TUI.
#[derive(Debug)]
pub struct App {
    /// Latest state published by the dashboard controller.
    pub state: DashboardState,
    /// Push-channel path the test command is written to.
    pub command_path: String,
    /// Whether the help overlay is visible.
    pub show_help: bool,
    /// Whether a test command is in flight.
    pub sending: bool,
    should_quit: bool,
    status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(state: DashboardState, command_path: impl Into<String>) -> Self {
        Self {
            state,
            command_path: command_path.into(),
            show_help: false,
            sending: false,
            should_quit: false,
            status_message: None,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Apply a key press. Returns work for the runtime, if any.
    pub fn handle_key(&mut self, key: KeyCode) -> Option<UiCommand> {
        match handle_key(key, self.show_help) {
            Action::Quit => self.should_quit = true,
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::CloseHelp => self.show_help = false,
            Action::SendTest if self.sending => {
                self.push_status_message("Test command already in flight");
            }
            Action::SendTest => {
                self.sending = true;
                let message = format!("Sending test command to {}...", self.command_path);
                self.push_status_message(message);
                return Some(UiCommand::SendTest);
            }
            Action::None => {}
        }
        None
    }

    /// Surface dashboard events that deserve the operator's attention.
    pub fn handle_event(&mut self, event: &DashboardEvent) {
        match event {
            DashboardEvent::AlertRaised {
                sensor_type,
                message,
            } => {
                let sensor = if sensor_type.is_empty() {
                    "SENSOR".to_string()
                } else {
                    sensor_type.to_uppercase()
                };
                self.push_status_message(format!("Alert: {}: {}", sensor, message));
            }
            DashboardEvent::Online => self.push_status_message("Device back online"),
            DashboardEvent::Offline { .. } => self.push_status_message("Device went offline"),
            DashboardEvent::Notified {
                delivered: false,
                detail,
            } if detail != "unsupported" => {
                self.push_status_message(format!("Notification not shown: {}", detail));
            }
            _ => {}
        }
    }

    /// Record the outcome of a test command.
    pub fn command_finished(&mut self, result: Result<(), String>) {
        self.sending = false;
        match result {
            Ok(()) => self.push_status_message("Test command sent"),
            Err(e) => self.push_status_message(format!("Test command failed: {}", e)),
        }
    }

    pub fn push_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Current status message, if it has not expired.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message
            .as_ref()
            .filter(|(_, at)| at.elapsed() < MESSAGE_TTL)
            .map(|(m, _)| m.as_str())
    }

    pub fn clean_expired_messages(&mut self) {
        if self
            .status_message
            .as_ref()
            .is_some_and(|(_, at)| at.elapsed() >= MESSAGE_TTL)
        {
            self.status_message = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(DashboardState::default(), "SensorStatus/command")
    }

    #[test]
    fn test_quit() {
        let mut app = app();
        assert!(!app.should_quit());
        assert_eq!(app.handle_key(KeyCode::Char('q')), None);
        assert!(app.should_quit());
    }

    #[test]
    fn test_send_test_once_while_in_flight() {
        let mut app = app();
        assert_eq!(app.handle_key(KeyCode::Char('t')), Some(UiCommand::SendTest));
        assert!(app.sending);
        assert_eq!(app.handle_key(KeyCode::Char('t')), None);

        app.command_finished(Ok(()));
        assert!(!app.sending);
        assert_eq!(app.status_message(), Some("Test command sent"));
        assert_eq!(app.handle_key(KeyCode::Char('t')), Some(UiCommand::SendTest));
    }

    #[test]
    fn test_command_failure_message() {
        let mut app = app();
        app.handle_key(KeyCode::Char('t'));
        app.command_finished(Err("permission denied".into()));
        assert_eq!(
            app.status_message(),
            Some("Test command failed: permission denied")
        );
    }

    #[test]
    fn test_help_toggle_and_escape() {
        let mut app = app();
        app.handle_key(KeyCode::Char('?'));
        assert!(app.show_help);
        app.handle_key(KeyCode::Esc);
        assert!(!app.show_help);
        assert!(!app.should_quit());
    }

    #[test]
    fn test_alert_event_sets_message() {
        let mut app = app();
        app.handle_event(&DashboardEvent::AlertRaised {
            sensor_type: "motion".into(),
            message: "Rat seen".into(),
        });
        assert_eq!(app.status_message(), Some("Alert: MOTION: Rat seen"));
    }

    #[test]
    fn test_unsupported_notification_is_quiet() {
        let mut app = app();
        app.handle_event(&DashboardEvent::Notified {
            delivered: false,
            detail: "unsupported".into(),
        });
        assert_eq!(app.status_message(), None);

        app.handle_event(&DashboardEvent::Notified {
            delivered: false,
            detail: "permission denied".into(),
        });
        assert_eq!(
            app.status_message(),
            Some("Notification not shown: permission denied")
        );
    }
}
