//! Watch command implementation.
//!
//! Runs the dashboard controller headless and prints its events as they
//! happen: field updates, online/offline transitions, alerts and
//! notification outcomes. Desktop notifications are shown as in the
//! interactive dashboard unless `--no-notify` is given.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, SecondsFormat};
use owo_colors::OwoColorize;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use ratwatch_core::EventReceiver;
use ratwatch_cli::backend::Backend;
use ratwatch_cli::config::Config;
use ratwatch_cli::format::{
    FormatOptions, format_event_csv_header, format_event_csv_line, format_event_json,
    format_event_text,
};

use crate::cli::OutputFormat;
use crate::util::append_output;

/// Arguments for the watch command.
pub struct WatchArgs<'a> {
    pub format: OutputFormat,
    pub count: usize,
    pub notify: bool,
    pub quiet: bool,
    pub output: Option<&'a PathBuf>,
    pub opts: FormatOptions,
}

pub async fn cmd_watch(config: &Config, args: WatchArgs<'_>) -> Result<()> {
    let backend = Backend::connect(config)?;
    let handle = backend.start_dashboard(config, args.notify)?;
    let events = handle.events();

    if !args.quiet {
        let target = backend.realtime.base_url();
        let header = if args.opts.no_color {
            format!("Watching: {}", target)
        } else {
            format!("Watching: {}", target.cyan())
        };
        eprintln!("{}", header);
        eprintln!("Press Ctrl+C to stop");
        eprintln!("{}", "-".repeat(50));
    }

    let output = args.output;
    let result = tokio::select! {
        printed = stream_events(events, args.format, args.count, &args.opts, |line| {
            append_output(output, line)
        }) => printed.map(|n| {
            if !args.quiet && args.count > 0 {
                eprintln!("Completed {} events.", n);
            }
        }),
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nShutting down...");
            Ok(())
        }
    };

    handle.shutdown().await;
    result
}

/// Print events until `count` lines were written (0 for unlimited) or the
/// dashboard stops. Returns the number of lines written.
pub(crate) async fn stream_events(
    mut events: EventReceiver,
    format: OutputFormat,
    count: usize,
    opts: &FormatOptions,
    mut sink: impl FnMut(&str) -> Result<()>,
) -> Result<usize> {
    let mut printed = 0;
    let mut header_written = opts.no_header;

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(n)) => {
                warn!(skipped = n, "Output fell behind, events skipped");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let now = Local::now();
        let line = match format {
            OutputFormat::Text => {
                format_event_text(&event, &now.format("%H:%M:%S").to_string(), opts)
            }
            OutputFormat::Json => Some(format_event_json(
                &event,
                &now.to_rfc3339_opts(SecondsFormat::Secs, false),
            )?),
            OutputFormat::Csv => {
                let mut out = String::new();
                if !header_written {
                    out.push_str(&format_event_csv_header());
                    header_written = true;
                }
                out.push_str(&format_event_csv_line(
                    &event,
                    &now.to_rfc3339_opts(SecondsFormat::Secs, false),
                ));
                Some(out)
            }
        };

        if let Some(line) = line {
            sink(&line)?;
            printed += 1;
            if count > 0 && printed >= count {
                break;
            }
        }
    }

    Ok(printed)
}
