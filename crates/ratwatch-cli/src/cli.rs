//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Parser)]
#[command(name = "ratwatch")]
#[command(author, version, about = "Live status, alerts and logs for the ratwatch sensor rig", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as JSON (shorthand for --format json)
    #[arg(long, global = true)]
    pub json: bool,

    /// Output compact JSON (no pretty-printing)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, env = "RATWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive terminal dashboard
    #[cfg(feature = "tui")]
    #[command(alias = "tui")]
    Dashboard,

    /// Stream status, liveness and alert changes
    Watch {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Number of events to print before exiting (0 for unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        count: usize,

        /// Do not show desktop notifications
        #[arg(long)]
        no_notify: bool,

        /// Omit header row in CSV output (useful for appending)
        #[arg(long)]
        no_header: bool,
    },

    /// Show the most recent sensor log entries
    Logs {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Number of entries (defaults to dashboard.log_limit)
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u16).range(1..))]
        limit: Option<u16>,

        /// Omit header row in CSV output (useful for appending)
        #[arg(long)]
        no_header: bool,
    },

    /// Write the test command to the rig
    Send {
        /// Value to write
        #[arg(default_value = "test")]
        value: String,

        /// Target path (defaults to paths.command)
        #[arg(long)]
        path: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    /// Realtime Database URL
    DatabaseUrl,
    /// Firebase project id
    ProjectId,
    /// Web API key
    ApiKey,
    /// Auth token
    AuthToken,
    /// Seconds of silence before the device is offline
    OfflineAfter,
    /// Number of log entries shown
    LogLimit,
    /// Document collection holding the sensor log
    LogCollection,
    /// Enable desktop notifications (true/false)
    Notifications,
    /// Notification policy (on_change, every_update)
    NotifyPolicy,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
        /// Configuration value
        value: String,
    },

    /// Unset (reset to default) a configuration value
    Unset {
        /// Configuration key to reset
        #[arg(value_enum)]
        key: ConfigKey,
    },

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Resolve the effective output format: `--json` wins.
pub fn resolve_format(format: OutputFormat, json: bool) -> OutputFormat {
    if json { OutputFormat::Json } else { format }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch() {
        let cli = Cli::try_parse_from(["ratwatch", "watch", "-n", "3", "--format", "json"]).unwrap();
        match cli.command {
            Commands::Watch { format, count, .. } => {
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(count, 3);
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_send_defaults_to_test() {
        let cli = Cli::try_parse_from(["ratwatch", "send"]).unwrap();
        match cli.command {
            Commands::Send { value, path } => {
                assert_eq!(value, "test");
                assert_eq!(path, None);
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn test_logs_limit_must_be_positive() {
        assert!(Cli::try_parse_from(["ratwatch", "logs", "-n", "0"]).is_err());
        assert!(Cli::try_parse_from(["ratwatch", "logs", "-n", "5"]).is_ok());
    }

    #[test]
    fn test_no_color_flag() {
        let cli = Cli::try_parse_from(["ratwatch", "--no-color", "config", "path"]).unwrap();
        assert!(cli.no_color);
    }

    #[test]
    fn test_json_flag_wins() {
        assert_eq!(resolve_format(OutputFormat::Csv, true), OutputFormat::Json);
        assert_eq!(resolve_format(OutputFormat::Csv, false), OutputFormat::Csv);
    }

    #[test]
    fn test_config_set_parses_key() {
        let cli =
            Cli::try_parse_from(["ratwatch", "config", "set", "database-url", "https://x"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Set {
                    key: ConfigKey::DatabaseUrl,
                    ..
                }
            }
        ));
    }
}
