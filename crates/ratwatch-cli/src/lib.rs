//! Command-line interface and terminal dashboard for the ratwatch rodent
//! sensor rig.
//!
//! The rig publishes its live status message and sensor type to a Firebase
//! Realtime Database and appends event records to a Firestore collection.
//! This crate wires those backends to [`ratwatch_core`] and presents the
//! result.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dashboard` | Interactive terminal dashboard |
//! | `watch` | Stream status, liveness and alert changes to stdout |
//! | `logs` | Print the most recent sensor log entries |
//! | `send` | Write the test command |
//! | `config` | Manage CLI configuration |
//! | `completions` | Generate shell completions |
//!
//! # Configuration
//!
//! Settings are stored in `~/.config/ratwatch/config.toml` (or platform
//! equivalent):
//!
//! ```toml
//! [firebase]
//! database_url = "https://my-rig-default-rtdb.firebaseio.com"
//! project_id = "my-rig"
//!
//! [dashboard]
//! offline_after_secs = 20
//! log_limit = 10
//!
//! [notifications]
//! enabled = true
//! policy = "on_change"
//! ```
//!
//! # Environment Variables
//!
//! - `RATWATCH_DATABASE_URL`, `RATWATCH_PROJECT_ID`, `RATWATCH_API_KEY`,
//!   `RATWATCH_AUTH_TOKEN`: override the `[firebase]` table
//! - `NO_COLOR`: Disable colored output when set

pub mod backend;
pub mod config;
pub mod format;
pub mod notifier;

// TUI module - publicly exposed for ratwatch-tui crate to use
#[cfg(feature = "tui")]
pub mod tui;

// Re-export core dependencies for convenience
pub use ratwatch_core;
pub use ratwatch_types;

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Build the log filter from the verbosity flags.
///
/// `-q` wins over `-v`; without either, `RUST_LOG` or `info` applies.
pub fn env_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Log to stderr.
pub fn init_tracing(filter: EnvFilter) {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Log to `<dir>/ratwatch.log` so the terminal dashboard stays clean.
pub fn init_file_tracing(filter: EnvFilter, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    let path = dir.join("ratwatch.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}
