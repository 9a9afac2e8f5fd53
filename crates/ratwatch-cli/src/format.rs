//! Output formatting utilities for text, JSON, and CSV output.

use anyhow::Result;
use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use serde::Serialize;
use time::OffsetDateTime;

use ratwatch_core::DashboardEvent;
use ratwatch_types::{AlertState, Liveness, LogEntry, SensorKind};

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Omit header row in CSV output.
    pub no_header: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self {
            no_color,
            ..Self::default()
        }
    }

    /// Create with no_header option for CSV output.
    pub fn with_no_header(mut self, no_header: bool) -> Self {
        self.no_header = no_header;
        self
    }

    /// Create with compact JSON option.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }
}

/// Escape a string for CSV output.
/// Wraps the value in quotes if it contains commas, quotes, or newlines.
#[must_use]
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Convert to local time for display.
pub fn to_local(ts: OffsetDateTime) -> Option<DateTime<Local>> {
    DateTime::from_timestamp(ts.unix_timestamp(), ts.nanosecond())
        .map(|utc| utc.with_timezone(&Local))
}

/// `YYYY-MM-DD HH:MM:SS` in local time, or `-` when missing.
#[must_use]
pub fn format_timestamp(ts: Option<OffsetDateTime>) -> String {
    ts.and_then(to_local)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Format age in human-readable format
#[must_use]
pub fn format_age(seconds: Option<u64>) -> String {
    match seconds {
        None => "never".to_string(),
        Some(s) if s < 60 => format!("{}s ago", s),
        Some(s) if s < 3600 => format!("{}m {}s ago", s / 60, s % 60),
        Some(s) => format!("{}h {}m ago", s / 3600, (s % 3600) / 60),
    }
}

/// Format liveness with color
#[must_use]
pub fn format_liveness(liveness: Liveness, no_color: bool) -> String {
    let label = match liveness {
        Liveness::Online => "ONLINE",
        Liveness::Offline => "OFFLINE",
    };
    if no_color {
        format!("[{}]", label)
    } else {
        match liveness {
            Liveness::Online => format!("[{}]", label.green()),
            Liveness::Offline => format!("[{}]", label.red()),
        }
    }
}

/// Format alert state with color
#[must_use]
pub fn format_alert_state(state: AlertState, no_color: bool) -> String {
    let label = match state {
        AlertState::Standby => "STANDBY",
        AlertState::Active => "ALERT",
    };
    if no_color {
        format!("[{}]", label)
    } else {
        match state {
            AlertState::Standby => format!("[{}]", label.dimmed()),
            AlertState::Active => format!("[{}]", label.yellow().bold()),
        }
    }
}

/// Upper-cased sensor name in the sensor kind's accent color.
#[must_use]
pub fn format_sensor(sensor: &str, no_color: bool) -> String {
    let label = if sensor.is_empty() {
        "SENSOR".to_string()
    } else {
        sensor.to_uppercase()
    };
    if no_color {
        label
    } else {
        let (r, g, b) = SensorKind::from_sensor_type(sensor).color_rgb();
        label.truecolor(r, g, b).to_string()
    }
}

// ============================================================================
// Event formatting (watch)
// ============================================================================

/// Stable name of an event, matching its JSON `type` tag.
#[must_use]
pub fn event_name(event: &DashboardEvent) -> &'static str {
    match event {
        DashboardEvent::Reading { .. } => "reading",
        DashboardEvent::Online => "online",
        DashboardEvent::Offline { .. } => "offline",
        DashboardEvent::AlertRaised { .. } => "alert_raised",
        DashboardEvent::AlertCleared => "alert_cleared",
        DashboardEvent::Notified { .. } => "notified",
        DashboardEvent::LogsRefreshed { .. } => "logs_refreshed",
        DashboardEvent::LogsFailed { .. } => "logs_failed",
        DashboardEvent::ChannelError { .. } => "channel_error",
        _ => "unknown",
    }
}

/// One human-readable line for an event, prefixed with `time`.
///
/// Periodic log refreshes are not shown; they would repeat every few
/// seconds without telling the operator anything new.
pub fn format_event_text(
    event: &DashboardEvent,
    time: &str,
    opts: &FormatOptions,
) -> Option<String> {
    let no_color = opts.no_color;
    let body = match event {
        DashboardEvent::Reading { reading } => format!(
            "{} {} {}",
            SensorKind::from_sensor_type(&reading.sensor_type).icon(),
            format_sensor(&reading.sensor_type, no_color),
            reading.message
        ),
        DashboardEvent::Online => {
            format!("{} device reporting", format_liveness(Liveness::Online, no_color))
        }
        DashboardEvent::Offline { silent_for_secs } => {
            let detail = match silent_for_secs {
                Some(s) => format!("no update for {}s", s),
                None => "no update received".to_string(),
            };
            format!("{} {}", format_liveness(Liveness::Offline, no_color), detail)
        }
        DashboardEvent::AlertRaised {
            sensor_type,
            message,
        } => format!(
            "{} {}: {}",
            format_alert_state(AlertState::Active, no_color),
            format_sensor(sensor_type, no_color),
            message
        ),
        DashboardEvent::AlertCleared => format!(
            "{} alert cleared",
            format_alert_state(AlertState::Standby, no_color)
        ),
        DashboardEvent::Notified { delivered, detail } => {
            if *delivered {
                "Notification sent".to_string()
            } else {
                format!("Notification not shown: {}", detail)
            }
        }
        DashboardEvent::LogsRefreshed { .. } => return None,
        DashboardEvent::LogsFailed { error } => format!("Log refresh failed: {}", error),
        DashboardEvent::ChannelError { path, error } => format!("{}: {}", path, error),
        _ => return None,
    };

    let prefix = if no_color {
        time.to_string()
    } else {
        time.dimmed().to_string()
    };
    Some(format!("{} {}\n", prefix, body))
}

#[derive(Serialize)]
struct TimedEvent<'a> {
    time: &'a str,
    #[serde(flatten)]
    event: &'a DashboardEvent,
}

/// One JSON object per line, with a `time` field added.
pub fn format_event_json(event: &DashboardEvent, time: &str) -> Result<String> {
    let json = serde_json::to_string(&TimedEvent { time, event })?;
    Ok(json + "\n")
}

#[must_use]
pub fn format_event_csv_header() -> String {
    "time,event,sensor_type,message\n".to_string()
}

/// CSV row for an event. Events without a sensor or message leave the
/// columns empty.
#[must_use]
pub fn format_event_csv_line(event: &DashboardEvent, time: &str) -> String {
    let (sensor_type, message) = match event {
        DashboardEvent::Reading { reading } => {
            (reading.sensor_type.clone(), reading.message.clone())
        }
        DashboardEvent::AlertRaised {
            sensor_type,
            message,
        } => (sensor_type.clone(), message.clone()),
        DashboardEvent::Offline {
            silent_for_secs: Some(s),
        } => (String::new(), format!("silent for {}s", s)),
        DashboardEvent::Notified { detail, .. } => (String::new(), detail.clone()),
        DashboardEvent::LogsRefreshed { entries } => (String::new(), entries.len().to_string()),
        DashboardEvent::LogsFailed { error } => (String::new(), error.clone()),
        DashboardEvent::ChannelError { path, error } => (path.clone(), error.clone()),
        _ => (String::new(), String::new()),
    };
    format!(
        "{},{},{},{}\n",
        csv_escape(time),
        event_name(event),
        csv_escape(&sensor_type),
        csv_escape(&message)
    )
}

// ============================================================================
// Log formatting
// ============================================================================

pub fn format_logs_text(entries: &[LogEntry], opts: &FormatOptions) -> String {
    if entries.is_empty() {
        return "No logs yet.\n".to_string();
    }

    let mut out = String::new();
    for entry in entries {
        let time = format_timestamp(entry.timestamp);
        let time = if opts.no_color {
            time
        } else {
            time.dimmed().to_string()
        };
        out.push_str(&format!(
            "{}  [{}] {}\n",
            time,
            format_sensor(&entry.sensor, opts.no_color),
            entry.message
        ));
    }
    out
}

pub fn format_logs_json(entries: &[LogEntry], opts: &FormatOptions) -> Result<String> {
    #[derive(Serialize)]
    struct LogsResult<'a> {
        count: usize,
        entries: &'a [LogEntry],
    }

    opts.as_json(&LogsResult {
        count: entries.len(),
        entries,
    })
}

pub fn format_logs_csv(entries: &[LogEntry], opts: &FormatOptions) -> String {
    let mut out = String::new();
    if !opts.no_header {
        out.push_str("id,timestamp,sensor,message\n");
    }
    for entry in entries {
        let timestamp = entry
            .timestamp
            .and_then(|t| t.format(&time::format_description::well_known::Rfc3339).ok())
            .unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_escape(&entry.id),
            timestamp,
            csv_escape(&entry.sensor),
            csv_escape(&entry.message)
        ));
    }
    out
}
