//! Send command implementation.
//!
//! Writes a command value (by default `test`) to the rig's command path,
//! retrying transient failures.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use ratwatch_cli::backend::Backend;
use ratwatch_cli::config::Config;
use ratwatch_core::{PushChannel, RetryConfig, send_command};

pub async fn cmd_send(
    config: &Config,
    value: &str,
    path: Option<&str>,
    quiet: bool,
    no_color: bool,
) -> Result<()> {
    let backend = Backend::connect(config)?;
    let path = path.unwrap_or(&config.paths.command);
    write_command(&backend.realtime, path, value, &RetryConfig::for_write()).await?;

    if !quiet {
        if no_color {
            println!("Sent '{}' to {}", value, path);
        } else {
            println!("{} Sent '{}' to {}", "✓".green(), value, path.cyan());
        }
    }
    Ok(())
}

async fn write_command<C: PushChannel + ?Sized>(
    channel: &C,
    path: &str,
    value: &str,
    retry: &RetryConfig,
) -> Result<()> {
    if path.trim().is_empty() {
        anyhow::bail!("Command path must not be empty");
    }
    send_command(channel, path, value, retry)
        .await
        .with_context(|| format!("Failed to write '{}' to {}", value, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ratwatch_core::MockPushChannel;

    fn fast_retry() -> RetryConfig {
        RetryConfig::new(2)
            .initial_delay(Duration::from_millis(1))
            .jitter(false)
    }

    #[tokio::test]
    async fn test_write_command_retries_transient_failure() {
        let channel = MockPushChannel::new();
        channel.fail_next_writes(1);

        write_command(&channel, "SensorStatus/command", "test", &fast_retry())
            .await
            .unwrap();

        assert_eq!(
            channel.writes(),
            vec![("SensorStatus/command".to_string(), "test".to_string())]
        );
    }

    #[tokio::test]
    async fn test_write_command_reports_path_on_failure() {
        let channel = MockPushChannel::new();
        channel.fail_next_writes(10);

        let err = write_command(&channel, "SensorStatus/command", "test", &fast_retry())
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("SensorStatus/command"));
    }

    #[tokio::test]
    async fn test_write_command_rejects_empty_path() {
        let channel = MockPushChannel::new();
        assert!(write_command(&channel, " ", "test", &fast_retry()).await.is_err());
        assert!(channel.writes().is_empty());
    }
}
