//! The dashboard controller.
//!
//! [`Dashboard::start`] spawns one event-loop task that owns the
//! [`DashboardState`]. Everything that changes the state reaches that task
//! as a message: field snapshots from the push channel, liveness and log
//! refresh ticks, and completed log fetches. Front ends observe the state
//! through a `watch` channel and changes through [`DashboardEvent`]s.
//!
//! Background work is structured under one cancellation token. Dropping or
//! shutting down the [`DashboardHandle`] releases both field subscriptions,
//! stops both timers, aborts any pending fetch and ends the notification
//! worker, so no stale callback can touch the state afterwards.
//!
//! ```ignore
//! use ratwatch_core::{Dashboard, DashboardConfig, MockDocumentStore, MockNotifier, MockPushChannel};
//!
//! let handle = Dashboard::new(
//!     MockPushChannel::new(),
//!     MockDocumentStore::new(),
//!     MockNotifier::new(),
//!     DashboardConfig::default(),
//! )
//! .start()?;
//!
//! let mut states = handle.subscribe_state();
//! states.changed().await?;
//! println!("{:?}", states.borrow().liveness());
//! handle.shutdown().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ratwatch_types::{LogEntry, Liveness};

use crate::alert::{AlertTransition, NotifyPolicy};
use crate::clock::{Clock, TokioClock};
use crate::error::{Error, Result};
use crate::events::{DashboardEvent, EventDispatcher, EventReceiver};
use crate::liveness::LivenessConfig;
use crate::logs::{DEFAULT_FETCH_TIMEOUT, DEFAULT_REFRESH_INTERVAL, LogFetcher, LogQuery};
use crate::notify::NotificationDispatcher;
use crate::retry::{Backoff, RetryConfig};
use crate::state::DashboardState;
use crate::subscription::SnapshotResult;
use crate::traits::{DocumentStore, Notifier, PushChannel};

/// Default path of the live status message.
pub const DEFAULT_MESSAGE_PATH: &str = "SensorStatus/message";
/// Default path of the live sensor type.
pub const DEFAULT_SENSOR_TYPE_PATH: &str = "SensorStatus/sensorType";
/// Default path the test command is written to.
pub const DEFAULT_COMMAND_PATH: &str = "SensorStatus/command";

const FIELD_BUFFER: usize = 32;
const NOTIFY_BUFFER: usize = 16;

/// Push-channel paths used by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardPaths {
    /// Live status message.
    pub message: String,
    /// Live sensor type.
    pub sensor_type: String,
    /// Test command target.
    pub command: String,
}

impl Default for DashboardPaths {
    fn default() -> Self {
        Self {
            message: DEFAULT_MESSAGE_PATH.to_string(),
            sensor_type: DEFAULT_SENSOR_TYPE_PATH.to_string(),
            command: DEFAULT_COMMAND_PATH.to_string(),
        }
    }
}

/// Dashboard configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Push-channel paths.
    pub paths: DashboardPaths,
    /// Liveness threshold and check interval.
    pub liveness: LivenessConfig,
    /// Interval between log refreshes. The first refresh runs at start.
    pub log_refresh_interval: Duration,
    /// Log query.
    pub log_query: LogQuery,
    /// Upper bound on one log fetch.
    pub fetch_timeout: Duration,
    /// When active alerts notify.
    pub notify_policy: NotifyPolicy,
    /// Backoff between resubscription attempts.
    pub resubscribe: RetryConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            paths: DashboardPaths::default(),
            liveness: LivenessConfig::default(),
            log_refresh_interval: DEFAULT_REFRESH_INTERVAL,
            log_query: LogQuery::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            notify_policy: NotifyPolicy::default(),
            resubscribe: RetryConfig::for_reconnect(),
        }
    }
}

impl DashboardConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.liveness.validate()?;
        self.log_query.validate()?;
        if self.log_refresh_interval.is_zero() {
            return Err(Error::invalid_config("log refresh interval must be > 0"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(Error::invalid_config("fetch timeout must be > 0"));
        }
        if self.paths.message.is_empty() || self.paths.sensor_type.is_empty() {
            return Err(Error::invalid_config("field paths must not be empty"));
        }
        Ok(())
    }
}

/// A dashboard wired to its backends, not yet running.
pub struct Dashboard<C, S, N> {
    channel: C,
    store: S,
    notifier: N,
    config: DashboardConfig,
    clock: Option<Arc<dyn Clock>>,
}

impl<C, S, N> Dashboard<C, S, N>
where
    C: PushChannel + 'static,
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    /// Wire a dashboard to its backends.
    pub fn new(channel: C, store: S, notifier: N, config: DashboardConfig) -> Self {
        Self {
            channel,
            store,
            notifier,
            config,
            clock: None,
        }
    }

    /// Use a specific clock instead of a [`TokioClock`] anchored at start.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Start the event loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> Result<DashboardHandle> {
        self.config.validate()?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(TokioClock::new()) as Arc<dyn Clock>);
        let state = DashboardState::new(self.config.liveness, self.config.notify_policy);
        let (state_tx, state_rx) = watch::channel(state.clone());
        let events = EventDispatcher::default();
        let cancel = CancellationToken::new();

        let fetcher = LogFetcher::new(self.store, self.config.log_query.clone())
            .with_timeout(self.config.fetch_timeout);

        let event_loop = EventLoop {
            state,
            state_tx,
            events: events.clone(),
            clock,
            config: self.config,
            fetcher: Arc::new(fetcher),
            cancel: cancel.clone(),
            sensor_type_seen: false,
            held_alert: None,
        };
        let task = tokio::spawn(event_loop.run(Arc::new(self.channel), self.notifier));

        info!("Dashboard started");
        Ok(DashboardHandle {
            state_rx,
            events,
            cancel,
            task: Some(task),
        })
    }
}

/// Handle to a running dashboard.
///
/// Dropping the handle stops the dashboard.
#[derive(Debug)]
pub struct DashboardHandle {
    state_rx: watch::Receiver<DashboardState>,
    events: EventDispatcher,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl DashboardHandle {
    /// Snapshot of the current state.
    pub fn state(&self) -> DashboardState {
        self.state_rx.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<DashboardState> {
        self.state_rx.clone()
    }

    /// Subscribe to dashboard events from now on.
    pub fn events(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Whether the event loop is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the dashboard and wait for all background work to end.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "Dashboard task ended abnormally");
        }
        info!("Dashboard stopped");
    }
}

impl Drop for DashboardHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Message,
    SensorType,
}

#[derive(Debug)]
struct FieldUpdate {
    field: Field,
    result: SnapshotResult,
}

struct EventLoop<S> {
    state: DashboardState,
    state_tx: watch::Sender<DashboardState>,
    events: EventDispatcher,
    clock: Arc<dyn Clock>,
    config: DashboardConfig,
    fetcher: Arc<LogFetcher<S>>,
    cancel: CancellationToken,
    sensor_type_seen: bool,
    held_alert: Option<String>,
}

impl<S: DocumentStore + 'static> EventLoop<S> {
    async fn run<C, N>(mut self, channel: Arc<C>, notifier: N)
    where
        C: PushChannel + 'static,
        N: Notifier + 'static,
    {
        let (field_tx, mut field_rx) = mpsc::channel(FIELD_BUFFER);
        let (fetch_tx, mut fetch_rx) = mpsc::channel::<Result<Vec<LogEntry>>>(1);
        let (notify_tx, notify_rx) = mpsc::channel(NOTIFY_BUFFER);

        let workers = vec![
            tokio::spawn(watch_field(
                Arc::clone(&channel),
                Field::Message,
                self.config.paths.message.clone(),
                field_tx.clone(),
                self.config.resubscribe.clone(),
                self.cancel.child_token(),
            )),
            tokio::spawn(watch_field(
                channel,
                Field::SensorType,
                self.config.paths.sensor_type.clone(),
                field_tx,
                self.config.resubscribe.clone(),
                self.cancel.child_token(),
            )),
            tokio::spawn(notify_worker(
                NotificationDispatcher::new(notifier),
                notify_rx,
                self.events.clone(),
                self.cancel.child_token(),
            )),
        ];

        let mut liveness_tick = interval(self.config.liveness.check_interval);
        liveness_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut log_tick = interval(self.config.log_refresh_interval);
        log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut pending_fetch: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                Some(update) = field_rx.recv() => {
                    self.on_field(update, &notify_tx);
                }
                Some(result) = fetch_rx.recv() => {
                    pending_fetch = None;
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    self.on_fetch(result);
                }
                _ = liveness_tick.tick() => {
                    let now = self.clock.now();
                    if let Some(liveness) = self.state.liveness_tick(now) {
                        self.publish_liveness(liveness, now);
                        self.publish_state();
                    }
                }
                _ = log_tick.tick() => {
                    // A fetch task that died without reporting no longer counts
                    if pending_fetch.as_ref().is_some_and(|f| !f.is_finished()) {
                        debug!("Log fetch still pending, skipping refresh");
                        continue;
                    }
                    let fetcher = Arc::clone(&self.fetcher);
                    let tx = fetch_tx.clone();
                    pending_fetch = Some(tokio::spawn(async move {
                        let _ = tx.send(fetcher.fetch().await).await;
                    }));
                }
            }
        }

        if let Some(fetch) = pending_fetch {
            fetch.abort();
        }
        drop(field_rx);
        drop(fetch_rx);
        drop(notify_tx);
        for worker in workers {
            let _ = worker.await;
        }
        debug!("Dashboard event loop finished");
    }

    fn on_field(&mut self, update: FieldUpdate, notify_tx: &mpsc::Sender<(String, String)>) {
        let snapshot = match update.result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Push channel error");
                let path = match &e {
                    Error::Channel { path, .. } => path.clone(),
                    _ => self.path_of(update.field).to_string(),
                };
                self.state.channel_failed(e.to_string());
                self.events.send(DashboardEvent::ChannelError {
                    path,
                    error: e.to_string(),
                });
                if update.field == Field::SensorType {
                    self.release_held_alert(notify_tx);
                }
                self.publish_state();
                return;
            }
        };

        let now = self.clock.now();
        let change = match update.field {
            Field::Message => self.state.message_received(snapshot.text(), now),
            Field::SensorType => self.state.sensor_type_received(snapshot.text(), now),
        };
        debug!(path = %snapshot.path, value = snapshot.text(), "Field updated");
        if update.field == Field::SensorType {
            self.release_held_alert(notify_tx);
        }

        if let Some(reading) = self.state.reading() {
            self.events.send(DashboardEvent::Reading { reading });
        }
        if let Some(liveness) = change.liveness {
            self.publish_liveness(liveness, now);
        }

        match change.alert {
            Some(AlertTransition::Raised { message }) => {
                info!(sensor_type = self.state.sensor_type(), %message, "Alert raised");
                self.events.send(DashboardEvent::AlertRaised {
                    sensor_type: self.state.sensor_type().to_string(),
                    message: message.clone(),
                });
                self.request_notification(notify_tx, message);
            }
            Some(AlertTransition::Repeated { message }) => {
                self.request_notification(notify_tx, message);
            }
            Some(AlertTransition::Cleared) => {
                info!("Alert cleared");
                self.held_alert = None;
                self.events.send(DashboardEvent::AlertCleared);
            }
            None => {}
        }

        self.publish_state();
    }

    fn on_fetch(&mut self, result: Result<Vec<LogEntry>>) {
        match result {
            Ok(entries) => {
                debug!(count = entries.len(), "Logs refreshed");
                self.state.logs_refreshed(entries.clone(), self.clock.now());
                self.events.send(DashboardEvent::LogsRefreshed { entries });
            }
            Err(e) => {
                warn!(error = %e, "Log refresh failed, keeping previous list");
                self.state.logs_failed(e.to_string());
                self.events.send(DashboardEvent::LogsFailed {
                    error: e.to_string(),
                });
            }
        }
        self.publish_state();
    }

    /// Queue a notification for the notify worker.
    ///
    /// Until the sensor type has arrived once, the newest alert is held so
    /// that its title reflects the sensor that raised it.
    fn request_notification(
        &mut self,
        notify_tx: &mpsc::Sender<(String, String)>,
        message: String,
    ) {
        if !self.sensor_type_seen {
            debug!(%message, "Holding notification until the sensor type arrives");
            self.held_alert = Some(message);
            return;
        }
        let sensor_type = self.state.sensor_type().to_string();
        if let Err(e) = notify_tx.try_send((sensor_type, message)) {
            warn!(error = %e, "Notification queue full, dropping notification");
        }
    }

    fn release_held_alert(&mut self, notify_tx: &mpsc::Sender<(String, String)>) {
        self.sensor_type_seen = true;
        if let Some(message) = self.held_alert.take() {
            self.request_notification(notify_tx, message);
        }
    }

    fn publish_liveness(&self, liveness: Liveness, now: time::OffsetDateTime) {
        match liveness {
            Liveness::Online => {
                info!("Device online");
                self.events.send(DashboardEvent::Online);
            }
            Liveness::Offline => {
                let silent_for_secs = self.state.age_secs(now);
                info!(?silent_for_secs, "Device offline");
                self.events.send(DashboardEvent::Offline { silent_for_secs });
            }
        }
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.state.clone());
    }

    fn path_of(&self, field: Field) -> &str {
        match field {
            Field::Message => &self.config.paths.message,
            Field::SensorType => &self.config.paths.sensor_type,
        }
    }
}

/// Keep one field subscribed, resubscribing with backoff when it fails.
async fn watch_field<C: PushChannel>(
    channel: Arc<C>,
    field: Field,
    path: String,
    tx: mpsc::Sender<FieldUpdate>,
    retry: RetryConfig,
    cancel: CancellationToken,
) {
    let mut backoff = Backoff::new(retry);

    loop {
        let subscribed = tokio::select! {
            _ = cancel.cancelled() => return,
            result = channel.subscribe(&path) => result,
        };

        let failure = match subscribed {
            Ok(mut subscription) => {
                debug!(%path, "Subscribed");
                backoff.reset();
                loop {
                    let item = tokio::select! {
                        _ = cancel.cancelled() => return,
                        item = subscription.recv() => item,
                    };
                    match item {
                        Some(result) => {
                            if !forward(&tx, FieldUpdate { field, result }, &cancel).await {
                                return;
                            }
                        }
                        None => break,
                    }
                }
                Error::channel(&path, "subscription ended")
            }
            Err(e) => e,
        };

        let update = FieldUpdate {
            field,
            result: Err(failure),
        };
        if !forward(&tx, update, &cancel).await {
            return;
        }

        let delay = backoff.next_delay();
        debug!(%path, ?delay, attempt = backoff.attempt(), "Resubscribing after delay");
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = sleep(delay) => {}
        }
    }
}

/// Hand an update to the event loop. Returns `false` once the loop is gone
/// or the dashboard is cancelled, so a full queue never blocks teardown.
async fn forward(
    tx: &mpsc::Sender<FieldUpdate>,
    update: FieldUpdate,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = tx.send(update) => sent.is_ok(),
    }
}

/// Owns the notification dispatcher so a slow scheduler never stalls the loop.
async fn notify_worker<N: Notifier>(
    mut dispatcher: NotificationDispatcher<N>,
    mut rx: mpsc::Receiver<(String, String)>,
    events: EventDispatcher,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = dispatcher.init() => {}
    }

    loop {
        let (sensor_type, message) = tokio::select! {
            _ = cancel.cancelled() => return,
            item = rx.recv() => match item {
                Some(item) => item,
                None => return,
            },
        };
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return,
            outcome = dispatcher.dispatch(&sensor_type, &message) => outcome,
        };
        events.send(DashboardEvent::notified(&outcome));
    }
}
