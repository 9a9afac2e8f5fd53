//! Keyboard input handling for the TUI.
//!
//! # Key Bindings
//!
//! | Key         | Action            |
//! |-------------|-------------------|
//! | `q` / `Esc` | Quit (Esc closes help first) |
//! | `t`         | Send test command |
//! | `?`         | Toggle help       |

use crossterm::event::KeyCode;

/// User actions that can be triggered by keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Quit the application.
    Quit,
    /// Write the test command to the rig.
    SendTest,
    /// Toggle the help overlay.
    ToggleHelp,
    /// Close the help overlay.
    CloseHelp,
    /// No action.
    None,
}

/// Map a key press to an action.
pub fn handle_key(key: KeyCode, help_open: bool) -> Action {
    match key {
        KeyCode::Esc if help_open => Action::CloseHelp,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('t') => Action::SendTest,
        KeyCode::Char('?') => Action::ToggleHelp,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_keys() {
        assert_eq!(handle_key(KeyCode::Char('q'), false), Action::Quit);
        assert_eq!(handle_key(KeyCode::Esc, false), Action::Quit);
    }

    #[test]
    fn test_esc_closes_help_first() {
        assert_eq!(handle_key(KeyCode::Esc, true), Action::CloseHelp);
        assert_eq!(handle_key(KeyCode::Char('q'), true), Action::Quit);
    }

    #[test]
    fn test_other_keys() {
        assert_eq!(handle_key(KeyCode::Char('t'), false), Action::SendTest);
        assert_eq!(handle_key(KeyCode::Char('?'), false), Action::ToggleHelp);
        assert_eq!(handle_key(KeyCode::Char('x'), false), Action::None);
    }
}
