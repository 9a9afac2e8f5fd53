//! Logs command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};

use ratwatch_cli::backend::Backend;
use ratwatch_cli::config::Config;
use ratwatch_cli::format::{FormatOptions, format_logs_csv, format_logs_json, format_logs_text};
use ratwatch_core::{DocumentStore, LogEntry, LogFetcher};

use crate::cli::OutputFormat;
use crate::util::write_output;

/// Arguments for the logs command.
pub struct LogsArgs<'a> {
    pub format: OutputFormat,
    pub limit: Option<u16>,
    pub output: Option<&'a PathBuf>,
    pub opts: FormatOptions,
}

pub async fn cmd_logs(config: &Config, args: LogsArgs<'_>) -> Result<()> {
    let mut config = config.clone();
    if let Some(limit) = args.limit {
        config.dashboard.log_limit = usize::from(limit);
    }

    let backend = Backend::connect(&config)?;
    let fetcher = backend.log_fetcher(&config)?;
    let entries = fetch_entries(&fetcher).await?;

    let content = render(&entries, args.format, &args.opts)?;
    write_output(args.output, &content)
}

async fn fetch_entries<S: DocumentStore>(fetcher: &LogFetcher<S>) -> Result<Vec<LogEntry>> {
    fetcher
        .fetch()
        .await
        .with_context(|| format!("Failed to load logs from '{}'", fetcher.query().collection))
}

fn render(entries: &[LogEntry], format: OutputFormat, opts: &FormatOptions) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_logs_text(entries, opts)),
        OutputFormat::Json => format_logs_json(entries, opts),
        OutputFormat::Csv => Ok(format_logs_csv(entries, opts)),
    }
}
