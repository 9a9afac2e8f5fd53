use anyhow::Result;

use ratwatch_cli::config::{Config, log_dir};
use ratwatch_cli::{env_filter, init_file_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    // The terminal belongs to the dashboard, so logs go to a file
    init_file_tracing(env_filter(false, false), &log_dir())?;

    let config = match std::env::var_os("RATWATCH_CONFIG") {
        Some(path) => Config::load_or_default(path.as_ref()),
        None => Config::load(),
    };

    ratwatch_tui::tui::run(config).await
}
