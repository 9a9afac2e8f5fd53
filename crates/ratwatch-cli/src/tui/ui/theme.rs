//! Color palette and shared styles for the dashboard.
//!
//! Colors follow the Tailwind palette used by the rig's web front end.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::BorderType;

/// Dashboard theme.
#[derive(Debug, Clone, Copy)]
pub struct AppTheme {
    pub primary: Color,

    // Status colors
    pub online: Color,
    pub offline: Color,
    pub accent: Color,

    // Text colors
    pub text_primary: Color,
    pub text_secondary: Color,
    pub text_muted: Color,

    pub border: Color,
    pub bg_header: Color,
}

impl Default for AppTheme {
    fn default() -> Self {
        Self::dark()
    }
}

impl AppTheme {
    #[must_use]
    pub const fn dark() -> Self {
        Self {
            primary: Color::Rgb(34, 211, 238), // cyan-400

            online: Color::Rgb(74, 222, 128), // green-400, #4ade80
            offline: Color::Rgb(239, 68, 68), // red-500, #ef4444
            accent: Color::Rgb(250, 204, 21), // yellow-400, #facc15

            text_primary: Color::Rgb(248, 250, 252),   // slate-50
            text_secondary: Color::Rgb(148, 163, 184), // slate-400
            text_muted: Color::Rgb(100, 116, 139),     // slate-500

            border: Color::Rgb(71, 85, 105),  // slate-600
            bg_header: Color::Rgb(30, 41, 59), // slate-800
        }
    }

    #[inline]
    #[must_use]
    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    #[inline]
    #[must_use]
    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    #[inline]
    #[must_use]
    pub fn header_style(&self) -> Style {
        Style::default().bg(self.bg_header)
    }
}

/// Default border type for all blocks.
pub const BORDER_TYPE: BorderType = BorderType::Rounded;
