//! Config command implementation.
//!
//! Reads and edits the config file directly. Environment overrides are
//! not applied here so `set` never writes them back to disk.

use std::path::Path;

use anyhow::{Context, Result, bail};

use ratwatch_cli::config::{Config, DashboardSection, NotificationsSection, mask_secret};
use ratwatch_core::NotifyPolicy;

use crate::cli::{ConfigAction, ConfigKey};

pub fn cmd_config(action: ConfigAction, path: &Path, quiet: bool) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Show => {
            let config = load_file(path)?;
            if !quiet && !path.exists() {
                eprintln!("No config file at {}; showing defaults.", path.display());
            }
            let content = toml::to_string_pretty(&masked(&config))
                .context("Failed to serialize config")?;
            print!("{}", content);
        }
        ConfigAction::Get { key } => {
            let config = load_file(path)?;
            match get_value(&config, key) {
                Some(value) => println!("{}", value),
                None => {
                    if !quiet {
                        eprintln!("{} is not set", key_name(key));
                    }
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = load_file(path)?;
            set_value(&mut config, key, &value)?;
            config.save_to(path)?;
            if !quiet {
                let shown = if is_secret(key) {
                    mask_secret(&value)
                } else {
                    value
                };
                println!("Set {} = {}", key_name(key), shown);
            }
        }
        ConfigAction::Unset { key } => {
            let mut config = load_file(path)?;
            unset_value(&mut config, key);
            config.save_to(path)?;
            if !quiet {
                println!("Reset {}", key_name(key));
            }
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            Config::default().save_to(path)?;
            if !quiet {
                println!("Wrote default config to {}", path.display());
                println!();
                println!("Next: ratwatch config set database-url <url>");
                println!("      ratwatch config set project-id <id>");
            }
        }
    }
    Ok(())
}

fn load_file(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load_from(path)
    } else {
        Ok(Config::default())
    }
}

fn key_name(key: ConfigKey) -> &'static str {
    match key {
        ConfigKey::DatabaseUrl => "firebase.database_url",
        ConfigKey::ProjectId => "firebase.project_id",
        ConfigKey::ApiKey => "firebase.api_key",
        ConfigKey::AuthToken => "firebase.auth_token",
        ConfigKey::OfflineAfter => "dashboard.offline_after_secs",
        ConfigKey::LogLimit => "dashboard.log_limit",
        ConfigKey::LogCollection => "dashboard.log_collection",
        ConfigKey::Notifications => "notifications.enabled",
        ConfigKey::NotifyPolicy => "notifications.policy",
    }
}

fn is_secret(key: ConfigKey) -> bool {
    matches!(key, ConfigKey::ApiKey | ConfigKey::AuthToken)
}

fn masked(config: &Config) -> Config {
    let mut config = config.clone();
    config.firebase.api_key = config.firebase.api_key.as_deref().map(mask_secret);
    config.firebase.auth_token = config.firebase.auth_token.as_deref().map(mask_secret);
    config
}

fn policy_name(policy: NotifyPolicy) -> &'static str {
    match policy {
        NotifyPolicy::OnChange => "on_change",
        NotifyPolicy::EveryUpdate => "every_update",
    }
}

fn get_value(config: &Config, key: ConfigKey) -> Option<String> {
    match key {
        ConfigKey::DatabaseUrl => config.firebase.database_url.clone(),
        ConfigKey::ProjectId => config.firebase.project_id.clone(),
        ConfigKey::ApiKey => config.firebase.api_key.as_deref().map(mask_secret),
        ConfigKey::AuthToken => config.firebase.auth_token.as_deref().map(mask_secret),
        ConfigKey::OfflineAfter => Some(config.dashboard.offline_after_secs.to_string()),
        ConfigKey::LogLimit => Some(config.dashboard.log_limit.to_string()),
        ConfigKey::LogCollection => Some(config.dashboard.log_collection.clone()),
        ConfigKey::Notifications => Some(config.notifications.enabled.to_string()),
        ConfigKey::NotifyPolicy => Some(policy_name(config.notifications.policy).to_string()),
    }
}

fn set_value(config: &mut Config, key: ConfigKey, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        bail!("Value for {} must not be empty", key_name(key));
    }

    match key {
        ConfigKey::DatabaseUrl => {
            if !value.starts_with("https://") && !value.starts_with("http://") {
                bail!("Database URL must start with https:// (got '{}')", value);
            }
            config.firebase.database_url = Some(value.trim_end_matches('/').to_string());
        }
        ConfigKey::ProjectId => config.firebase.project_id = Some(value.to_string()),
        ConfigKey::ApiKey => config.firebase.api_key = Some(value.to_string()),
        ConfigKey::AuthToken => config.firebase.auth_token = Some(value.to_string()),
        ConfigKey::OfflineAfter => {
            let secs: u64 = value
                .parse()
                .with_context(|| format!("Invalid number of seconds: '{}'", value))?;
            if secs == 0 {
                bail!("Offline threshold must be at least 1 second");
            }
            config.dashboard.offline_after_secs = secs;
        }
        ConfigKey::LogLimit => {
            let limit: usize = value
                .parse()
                .with_context(|| format!("Invalid log limit: '{}'", value))?;
            if limit == 0 {
                bail!("Log limit must be at least 1");
            }
            config.dashboard.log_limit = limit;
        }
        ConfigKey::LogCollection => config.dashboard.log_collection = value.to_string(),
        ConfigKey::Notifications => {
            config.notifications.enabled = match value.to_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => true,
                "false" | "off" | "no" | "0" => false,
                _ => bail!("Expected true or false (got '{}')", value),
            };
        }
        ConfigKey::NotifyPolicy => {
            config.notifications.policy = match value.to_lowercase().replace('-', "_").as_str() {
                "on_change" => NotifyPolicy::OnChange,
                "every_update" => NotifyPolicy::EveryUpdate,
                _ => bail!("Expected on_change or every_update (got '{}')", value),
            };
        }
    }
    Ok(())
}

fn unset_value(config: &mut Config, key: ConfigKey) {
    let dashboard = DashboardSection::default();
    let notifications = NotificationsSection::default();
    match key {
        ConfigKey::DatabaseUrl => config.firebase.database_url = None,
        ConfigKey::ProjectId => config.firebase.project_id = None,
        ConfigKey::ApiKey => config.firebase.api_key = None,
        ConfigKey::AuthToken => config.firebase.auth_token = None,
        ConfigKey::OfflineAfter => {
            config.dashboard.offline_after_secs = dashboard.offline_after_secs;
        }
        ConfigKey::LogLimit => config.dashboard.log_limit = dashboard.log_limit,
        ConfigKey::LogCollection => config.dashboard.log_collection = dashboard.log_collection,
        ConfigKey::Notifications => config.notifications.enabled = notifications.enabled,
        ConfigKey::NotifyPolicy => config.notifications.policy = notifications.policy,
    }
}
