//! Layout and rendering for the TUI dashboard.
//!
//! - **Header**: title and local time
//! - **Cards**: device status (left) and current alert (right)
//! - **Logs**: the newest sensor log entries
//! - **Status bar**: errors, transient messages or key hints

pub mod colors;
pub mod theme;

mod dashboard;

use chrono::Local;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use time::OffsetDateTime;

use super::app::App;
use theme::{AppTheme, BORDER_TYPE};

/// Draw the complete TUI interface.
pub fn draw(frame: &mut Frame, app: &App, now: OffsetDateTime) {
    let theme = AppTheme::default();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header bar
            Constraint::Length(5), // Status and alert cards
            Constraint::Min(3),    // Logs
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_header(frame, main_layout[0], &theme);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(main_layout[1]);
    dashboard::draw_status_card(frame, cards[0], &app.state, now, &theme);
    dashboard::draw_alert_card(frame, cards[1], &app.state, &theme);

    dashboard::draw_logs(frame, main_layout[2], &app.state, now, &theme);
    draw_status_bar(frame, main_layout[3], app, &theme);

    if app.show_help {
        draw_help_overlay(frame, &theme);
    }
}

fn draw_header(frame: &mut Frame, area: Rect, theme: &AppTheme) {
    let clock = Local::now().format("%H:%M:%S").to_string();
    let title = " Ratwatch ";
    let padding = (area.width as usize).saturating_sub(title.len() + clock.len() + 1);

    let line = Line::from(vec![
        Span::styled(title, theme.title_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(clock, Style::default().fg(theme.text_secondary)),
    ]);
    frame.render_widget(Paragraph::new(line).style(theme.header_style()), area);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App, theme: &AppTheme) {
    let line = if let Some(note) = app.state.status_note() {
        Line::from(Span::styled(
            format!(" {}", note.message),
            Style::default().fg(theme.offline),
        ))
    } else if let Some(message) = app.status_message() {
        Line::from(Span::styled(
            format!(" {}", message),
            Style::default().fg(theme.accent),
        ))
    } else {
        Line::from(vec![
            Span::styled(" q", Style::default().fg(theme.primary)),
            Span::styled(" quit  ", Style::default().fg(theme.text_muted)),
            Span::styled("t", Style::default().fg(theme.primary)),
            Span::styled(" send test  ", Style::default().fg(theme.text_muted)),
            Span::styled("?", Style::default().fg(theme.primary)),
            Span::styled(" help", Style::default().fg(theme.text_muted)),
        ])
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_help_overlay(frame: &mut Frame, theme: &AppTheme) {
    let area = centered_rect(50, 9, frame.area());
    let key = |k: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<6}", k), Style::default().fg(theme.primary)),
            Span::styled(what, Style::default().fg(theme.text_primary)),
        ])
    };

    let lines = vec![
        Line::from(""),
        key("q", "Quit"),
        key("t", "Send test command"),
        key("?", "Toggle this help"),
        key("Esc", "Close help"),
        Line::from(""),
        Line::from(Span::styled(
            "  Offline after 20s without an update",
            Style::default().fg(theme.text_muted),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .title_style(theme.title_style())
        .borders(Borders::ALL)
        .border_type(BORDER_TYPE)
        .border_style(Style::default().fg(theme.primary));

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Rectangle of `width` percent and `height` rows centered in `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = area.width * width / 100;
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}
