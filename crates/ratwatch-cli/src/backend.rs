//! Backend wiring shared by the CLI commands and the dashboard.

use anyhow::{Context, Result};
use tracing::info;

use ratwatch_core::firebase::{Firestore, RealtimeDatabase};
use ratwatch_core::{Dashboard, DashboardHandle, LogFetcher};

use crate::config::Config;
use crate::notifier::notifier;

/// Connected Firebase clients.
#[derive(Debug, Clone)]
pub struct Backend {
    pub realtime: RealtimeDatabase,
    pub firestore: Firestore,
}

impl Backend {
    /// Build both clients from the configuration.
    pub fn connect(config: &Config) -> Result<Self> {
        let firebase = config.firebase_config()?;
        let realtime =
            RealtimeDatabase::new(&firebase).context("Invalid Realtime Database settings")?;
        let firestore = Firestore::new(&firebase).context("Invalid Firestore settings")?;
        info!(
            database = realtime.base_url(),
            project = %firebase.project_id,
            "Backend configured"
        );
        Ok(Self {
            realtime,
            firestore,
        })
    }

    /// One-shot log fetcher for the configured collection.
    pub fn log_fetcher(&self, config: &Config) -> Result<LogFetcher<Firestore>> {
        let dashboard = config.dashboard_config()?;
        Ok(LogFetcher::new(self.firestore.clone(), dashboard.log_query)
            .with_timeout(dashboard.fetch_timeout))
    }

    /// Start a dashboard over these clients.
    ///
    /// `notify` is ANDed with the `[notifications]` setting.
    pub fn start_dashboard(&self, config: &Config, notify: bool) -> Result<DashboardHandle> {
        let dashboard = config.dashboard_config()?;
        let notifier = notifier(notify && config.notifications.enabled);
        Dashboard::new(
            self.realtime.clone(),
            self.firestore.clone(),
            notifier,
            dashboard,
        )
        .start()
        .context("Failed to start dashboard")
    }
}
