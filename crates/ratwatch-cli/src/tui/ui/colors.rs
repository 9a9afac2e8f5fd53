//! Color helpers for status indicators.

use ratatui::style::Color;

use ratwatch_types::{AlertState, Liveness, SensorKind};

use super::theme::AppTheme;

/// Green when online, red when offline.
#[must_use]
pub fn liveness_color(liveness: Liveness, theme: &AppTheme) -> Color {
    match liveness {
        Liveness::Online => theme.online,
        Liveness::Offline => theme.offline,
    }
}

/// Accent color of a sensor kind.
#[must_use]
pub fn kind_color(kind: SensorKind) -> Color {
    let (r, g, b) = kind.color_rgb();
    Color::Rgb(r, g, b)
}

/// Border color of the alert card: the sensor's color while an alert is
/// active, muted in standby.
#[must_use]
pub fn alert_color(state: AlertState, kind: SensorKind, theme: &AppTheme) -> Color {
    match state {
        AlertState::Active => kind_color(kind),
        AlertState::Standby => theme.text_muted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liveness_colors() {
        let theme = AppTheme::dark();
        assert_eq!(liveness_color(Liveness::Online, &theme), Color::Rgb(74, 222, 128));
        assert_eq!(liveness_color(Liveness::Offline, &theme), Color::Rgb(239, 68, 68));
    }

    #[test]
    fn test_alert_color_follows_kind_only_when_active() {
        let theme = AppTheme::dark();
        assert_eq!(
            alert_color(AlertState::Active, SensorKind::Motion, &theme),
            Color::Rgb(250, 204, 21)
        );
        assert_eq!(
            alert_color(AlertState::Standby, SensorKind::Motion, &theme),
            theme.text_muted
        );
    }
}
