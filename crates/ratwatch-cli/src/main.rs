use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use ratwatch_cli::config::Config;
use ratwatch_cli::format::FormatOptions;
use ratwatch_cli::{env_filter, init_tracing};

mod cli;
mod commands;
mod util;

use cli::{Cli, Commands, resolve_format};
use commands::{LogsArgs, WatchArgs, cmd_config, cmd_logs, cmd_send, cmd_watch};

#[tokio::main]
async fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "ratwatch", &mut io::stdout());
        return Ok(());
    }

    let filter = env_filter(cli.verbose, cli.quiet);

    // The dashboard owns the terminal, so its logs go to a file
    #[cfg(feature = "tui")]
    if matches!(cli.command, Commands::Dashboard) {
        let dir = ratwatch_cli::config::log_dir();
        ratwatch_cli::init_file_tracing(filter, &dir)?;
        let config = load_config(&cli);
        return ratwatch_cli::tui::run(config).await;
    }

    init_tracing(filter);

    if let Some(ref path) = cli.output {
        tracing::debug!("Output will be written to: {}", path.display());
    }

    let config_path = cli.config.clone().unwrap_or_else(Config::path);
    let opts = FormatOptions::new(cli.no_color).with_compact(cli.compact);

    match cli.command {
        Commands::Watch {
            format,
            count,
            no_notify,
            no_header,
        } => {
            let config = load_config(&cli);
            cmd_watch(
                &config,
                WatchArgs {
                    format: resolve_format(format, cli.json),
                    count,
                    notify: !no_notify,
                    quiet: cli.quiet,
                    output: cli.output.as_ref(),
                    opts: opts.with_no_header(no_header),
                },
            )
            .await?;
        }
        Commands::Logs {
            format,
            limit,
            no_header,
        } => {
            let config = load_config(&cli);
            cmd_logs(
                &config,
                LogsArgs {
                    format: resolve_format(format, cli.json),
                    limit,
                    output: cli.output.as_ref(),
                    opts: opts.with_no_header(no_header),
                },
            )
            .await?;
        }
        Commands::Send {
            ref value,
            ref path,
        } => {
            let config = load_config(&cli);
            cmd_send(&config, value, path.as_deref(), cli.quiet, cli.no_color).await?;
        }
        Commands::Config { action } => {
            cmd_config(action, &config_path, cli.quiet)?;
        }
        #[cfg(feature = "tui")]
        Commands::Dashboard => {
            // Already handled above
            unreachable!()
        }
        Commands::Completions { .. } => {
            // Already handled above
            unreachable!()
        }
    }

    Ok(())
}

/// Load the config from `--config` or the default location.
fn load_config(cli: &Cli) -> Config {
    match &cli.config {
        Some(path) => Config::load_or_default(path),
        None => Config::load(),
    }
}
