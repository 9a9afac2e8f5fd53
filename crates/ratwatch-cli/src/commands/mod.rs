//! Command implementations for the CLI.

mod config;
mod logs;
mod send;
mod watch;

pub use config::cmd_config;
pub use logs::{LogsArgs, cmd_logs};
pub use send::cmd_send;
pub use watch::{WatchArgs, cmd_watch};
