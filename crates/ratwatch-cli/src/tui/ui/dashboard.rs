//! Dashboard cards: device status, current alert and the recent log list.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use time::OffsetDateTime;

use ratwatch_core::{DashboardState, NoteSource};
use ratwatch_types::{AlertState, SensorKind};

use super::colors::{alert_color, kind_color, liveness_color};
use super::theme::{AppTheme, BORDER_TYPE};
use crate::format::{format_age, to_local};

fn card<'a>(title: &str, border: Color, theme: &AppTheme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BORDER_TYPE)
        .border_style(Style::default().fg(border))
        .title(format!(" {} ", title))
        .title_style(Style::default().fg(theme.text_primary))
}

/// Online/offline indicator and time since the last update.
pub(super) fn draw_status_card(
    frame: &mut Frame,
    area: Rect,
    state: &DashboardState,
    now: OffsetDateTime,
    theme: &AppTheme,
) {
    let liveness = state.liveness();
    let color = liveness_color(liveness, theme);

    let sensor = if state.sensor_type().is_empty() {
        "-".to_string()
    } else {
        state.sensor_type().to_string()
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("● ", Style::default().fg(color)),
            Span::styled(
                liveness.to_string(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Last update: ", Style::default().fg(theme.text_secondary)),
            Span::styled(
                format_age(state.age_secs(now)),
                Style::default().fg(theme.text_primary),
            ),
        ]),
        Line::from(vec![
            Span::styled("Sensor: ", Style::default().fg(theme.text_secondary)),
            Span::styled(sensor, Style::default().fg(theme.accent)),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(card("Device", color, theme));
    frame.render_widget(paragraph, area);
}

/// Current message, highlighted while an alert is active.
pub(super) fn draw_alert_card(
    frame: &mut Frame,
    area: Rect,
    state: &DashboardState,
    theme: &AppTheme,
) {
    let alert = state.alert_state();
    let kind = state.sensor_kind();
    let border = alert_color(alert, kind, theme);

    let headline = match alert {
        AlertState::Active => Line::from(vec![
            Span::styled(format!("{} ", kind.icon()), Style::default().fg(kind_color(kind))),
            Span::styled(
                kind.notification_title(),
                Style::default()
                    .fg(kind_color(kind))
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        AlertState::Standby => Line::from(Span::styled(
            "Standby",
            Style::default().fg(theme.text_muted),
        )),
    };

    let message = if state.message().is_empty() {
        Span::styled("No message", Style::default().fg(theme.text_muted))
    } else {
        Span::styled(
            state.message().to_string(),
            Style::default()
                .fg(theme.text_primary)
                .add_modifier(Modifier::BOLD),
        )
    };

    let paragraph = Paragraph::new(vec![headline, Line::from(message)])
        .wrap(Wrap { trim: true })
        .block(card("Alert", border, theme));
    frame.render_widget(paragraph, area);
}

/// `[SENSOR] message` list of the newest log entries.
pub(super) fn draw_logs(
    frame: &mut Frame,
    area: Rect,
    state: &DashboardState,
    now: OffsetDateTime,
    theme: &AppTheme,
) {
    let logs = state.logs();
    let mut title = format!("Recent Activity ({})", logs.len());
    if let Some(updated) = state.logs_updated_at() {
        let age = (now - updated).whole_seconds().max(0) as u64;
        title.push_str(&format!(" - updated {}", format_age(Some(age))));
    }

    let border = match state.status_note() {
        Some(note) if note.source == NoteSource::Logs => theme.offline,
        _ => theme.border,
    };
    let block = card(&title, border, theme);

    if logs.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No logs yet",
            Style::default().fg(theme.text_muted),
        )))
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = logs
        .iter()
        .map(|entry| {
            let time = entry
                .timestamp
                .and_then(to_local)
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "--:--:--".to_string());
            let kind = SensorKind::from_sensor_type(&entry.sensor);

            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", time), Style::default().fg(theme.text_muted)),
                Span::styled(
                    format!("[{}]", entry.sensor.to_uppercase()),
                    Style::default().fg(kind_color(kind)),
                ),
                Span::raw(" "),
                Span::styled(entry.message.clone(), Style::default().fg(theme.text_primary)),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}
