//! Configuration file management.
//!
//! Settings live in `<config dir>/ratwatch/config.toml`. Every table and
//! field is optional; missing values fall back to the dashboard defaults.
//! Connection secrets can also come from `RATWATCH_*` environment
//! variables, which take precedence over the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use ratwatch_core::firebase::{DEFAULT_FIRESTORE_ENDPOINT, FirebaseConfig};
use ratwatch_core::liveness::{DEFAULT_CHECK_INTERVAL, DEFAULT_THRESHOLD};
use ratwatch_core::logs::{
    DEFAULT_COLLECTION, DEFAULT_FETCH_TIMEOUT, DEFAULT_LIMIT, DEFAULT_REFRESH_INTERVAL,
};
use ratwatch_core::{
    DEFAULT_COMMAND_PATH, DEFAULT_MESSAGE_PATH, DEFAULT_SENSOR_TYPE_PATH, DashboardConfig,
    DashboardPaths, LivenessConfig, LogQuery, NotifyPolicy,
};

/// Environment variable holding the Realtime Database URL.
pub const ENV_DATABASE_URL: &str = "RATWATCH_DATABASE_URL";
/// Environment variable holding the Firebase project id.
pub const ENV_PROJECT_ID: &str = "RATWATCH_PROJECT_ID";
/// Environment variable holding the web API key.
pub const ENV_API_KEY: &str = "RATWATCH_API_KEY";
/// Environment variable holding the auth token.
pub const ENV_AUTH_TOKEN: &str = "RATWATCH_AUTH_TOKEN";

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub firebase: FirebaseSection,

    /// Push-channel paths
    #[serde(default)]
    pub paths: PathsSection,

    /// Liveness and log refresh settings
    #[serde(default)]
    pub dashboard: DashboardSection,

    /// Desktop notification settings
    #[serde(default)]
    pub notifications: NotificationsSection,
}

/// `[firebase]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirebaseSection {
    /// Realtime Database URL, e.g. `https://<db>.firebaseio.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Firebase project id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Web API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// ID token or database secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Firestore database id (default: `(default)`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,

    /// Firestore REST endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firestore_endpoint: Option<String>,
}

/// `[paths]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_message_path")]
    pub message: String,

    #[serde(default = "default_sensor_type_path")]
    pub sensor_type: String,

    /// Target of the `send` command
    #[serde(default = "default_command_path")]
    pub command: String,
}

fn default_message_path() -> String {
    DEFAULT_MESSAGE_PATH.to_string()
}

fn default_sensor_type_path() -> String {
    DEFAULT_SENSOR_TYPE_PATH.to_string()
}

fn default_command_path() -> String {
    DEFAULT_COMMAND_PATH.to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            message: default_message_path(),
            sensor_type: default_sensor_type_path(),
            command: default_command_path(),
        }
    }
}

/// `[dashboard]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSection {
    /// Seconds of silence after which the device is offline
    #[serde(default = "default_offline_after")]
    pub offline_after_secs: u64,

    /// Seconds between liveness checks
    #[serde(default = "default_liveness_check")]
    pub liveness_check_secs: u64,

    /// Seconds between log refreshes
    #[serde(default = "default_log_refresh")]
    pub log_refresh_secs: u64,

    /// Document collection holding the sensor log
    #[serde(default = "default_log_collection")]
    pub log_collection: String,

    /// Number of log entries shown
    #[serde(default = "default_log_limit")]
    pub log_limit: usize,

    /// Upper bound on one log fetch, in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_offline_after() -> u64 {
    DEFAULT_THRESHOLD.as_secs()
}

fn default_liveness_check() -> u64 {
    DEFAULT_CHECK_INTERVAL.as_secs()
}

fn default_log_refresh() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_secs()
}

fn default_log_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_log_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT.as_secs()
}

impl Default for DashboardSection {
    fn default() -> Self {
        Self {
            offline_after_secs: default_offline_after(),
            liveness_check_secs: default_liveness_check(),
            log_refresh_secs: default_log_refresh(),
            log_collection: default_log_collection(),
            log_limit: default_log_limit(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

/// `[notifications]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsSection {
    /// Show desktop notifications for new alerts
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `on_change` (default) or `every_update`
    #[serde(default)]
    pub policy: NotifyPolicy,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: NotifyPolicy::default(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ratwatch")
            .join("config.toml")
    }

    /// Load config from the default path with environment overrides applied.
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        Self::load_or_default(&Self::path())
    }

    /// Load config from `path` with environment overrides applied.
    pub fn load_or_default(path: &Path) -> Self {
        let mut config = if path.exists() {
            match Self::load_from(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: {:#}", e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Parse the file at `path` without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    /// Save config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Override connection settings from `RATWATCH_*` variables.
    ///
    /// Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_DATABASE_URL) {
            self.firebase.database_url = Some(v);
        }
        if let Some(v) = get(ENV_PROJECT_ID) {
            self.firebase.project_id = Some(v);
        }
        if let Some(v) = get(ENV_API_KEY) {
            self.firebase.api_key = Some(v);
        }
        if let Some(v) = get(ENV_AUTH_TOKEN) {
            self.firebase.auth_token = Some(v);
        }
    }

    /// Backend settings, failing when the database URL or project is unset.
    pub fn firebase_config(&self) -> Result<FirebaseConfig> {
        let Some(database_url) = self.firebase.database_url.as_deref() else {
            bail!(
                "No database URL configured. Set firebase.database_url in {} or {}.",
                Self::path().display(),
                ENV_DATABASE_URL
            );
        };
        let Some(project_id) = self.firebase.project_id.as_deref() else {
            bail!(
                "No project id configured. Set firebase.project_id in {} or {}.",
                Self::path().display(),
                ENV_PROJECT_ID
            );
        };

        let mut firebase = FirebaseConfig::new(database_url, project_id);
        firebase.api_key = self.firebase.api_key.clone();
        firebase.auth_token = self.firebase.auth_token.clone();
        if let Some(id) = &self.firebase.database_id {
            firebase.database_id = id.clone();
        }
        firebase.firestore_endpoint = self
            .firebase
            .firestore_endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_FIRESTORE_ENDPOINT.to_string());
        Ok(firebase)
    }

    /// Log query built from the `[dashboard]` table.
    pub fn log_query(&self) -> LogQuery {
        LogQuery::latest(&self.dashboard.log_collection, self.dashboard.log_limit)
    }

    /// Controller settings, validated.
    pub fn dashboard_config(&self) -> Result<DashboardConfig> {
        let config = DashboardConfig {
            paths: DashboardPaths {
                message: self.paths.message.clone(),
                sensor_type: self.paths.sensor_type.clone(),
                command: self.paths.command.clone(),
            },
            liveness: LivenessConfig {
                threshold: Duration::from_secs(self.dashboard.offline_after_secs),
                check_interval: Duration::from_secs(self.dashboard.liveness_check_secs),
            },
            log_refresh_interval: Duration::from_secs(self.dashboard.log_refresh_secs),
            log_query: self.log_query(),
            fetch_timeout: Duration::from_secs(self.dashboard.fetch_timeout_secs),
            notify_policy: self.notifications.policy,
            ..DashboardConfig::default()
        };
        config.validate().context("Invalid [dashboard] settings")?;
        Ok(config)
    }
}

/// Directory for the dashboard's log file.
pub fn log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ratwatch")
}

/// Hide all but the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}
