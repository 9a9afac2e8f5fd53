//! Dashboard view state and its transitions.
//!
//! [`DashboardState`] is plain data owned by the dashboard controller. It is
//! only changed through the transition methods below, each of which reports
//! what changed so the caller can publish events and dispatch notifications.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use ratwatch_types::{AlertState, Liveness, LogEntry, SensorKind, SensorReading};

use crate::alert::{AlertTracker, AlertTransition, NotifyPolicy};
use crate::liveness::{LivenessConfig, LivenessEvaluator};

/// Where a status note came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteSource {
    /// The push channel.
    Channel,
    /// The log fetcher.
    Logs,
}

/// Most recent error shown in the status area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNote {
    /// Component that reported it.
    pub source: NoteSource,
    /// Human-readable description.
    pub message: String,
}

/// Result of applying a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateChange {
    /// New liveness, if it changed.
    pub liveness: Option<Liveness>,
    /// Alert transition, if any.
    pub alert: Option<AlertTransition>,
}

impl StateChange {
    /// Whether anything changed.
    pub fn is_empty(&self) -> bool {
        self.liveness.is_none() && self.alert.is_none()
    }
}

/// State of one dashboard view.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    message: String,
    sensor_type: String,
    last_update: Option<OffsetDateTime>,
    liveness: Liveness,
    alert: AlertTracker,
    evaluator: LivenessEvaluator,
    logs: Vec<LogEntry>,
    logs_updated_at: Option<OffsetDateTime>,
    note: Option<StatusNote>,
}

impl DashboardState {
    /// Create an empty state: offline, standby, no logs.
    pub fn new(liveness: LivenessConfig, policy: NotifyPolicy) -> Self {
        Self {
            alert: AlertTracker::new(policy),
            evaluator: LivenessEvaluator::new(liveness),
            ..Default::default()
        }
    }

    /// Current status message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Current sensor type.
    pub fn sensor_type(&self) -> &str {
        &self.sensor_type
    }

    /// When the last field update was received.
    pub fn last_update(&self) -> Option<OffsetDateTime> {
        self.last_update
    }

    /// The latest reading, if any field has ever been received.
    pub fn reading(&self) -> Option<SensorReading> {
        self.last_update
            .map(|at| SensorReading::new(self.message.clone(), self.sensor_type.clone(), at))
    }

    /// Device liveness as of the last evaluation.
    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    /// Alert classification of the current message.
    pub fn alert_state(&self) -> AlertState {
        AlertState::from_message(&self.message)
    }

    /// Sensor kind for icon and colour lookup.
    pub fn sensor_kind(&self) -> SensorKind {
        SensorKind::from_sensor_type(&self.sensor_type)
    }

    /// Most recent log entries, newest first.
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// When the log list was last replaced.
    pub fn logs_updated_at(&self) -> Option<OffsetDateTime> {
        self.logs_updated_at
    }

    /// Outstanding error for the status area.
    pub fn status_note(&self) -> Option<&StatusNote> {
        self.note.as_ref()
    }

    /// Whole seconds since the last update.
    pub fn age_secs(&self, now: OffsetDateTime) -> Option<u64> {
        self.evaluator.age_secs(self.last_update, now)
    }

    /// The status message was pushed.
    pub fn message_received(&mut self, message: &str, now: OffsetDateTime) -> StateChange {
        self.message = message.to_string();
        let alert = self.alert.observe(message);
        let liveness = self.touch(now);
        StateChange { liveness, alert }
    }

    /// The sensor type was pushed.
    pub fn sensor_type_received(&mut self, sensor_type: &str, now: OffsetDateTime) -> StateChange {
        self.sensor_type = sensor_type.to_string();
        StateChange {
            liveness: self.touch(now),
            alert: None,
        }
    }

    /// Re-evaluate liveness without a new reading.
    ///
    /// Returns the new liveness if it changed.
    pub fn liveness_tick(&mut self, now: OffsetDateTime) -> Option<Liveness> {
        self.reevaluate(now)
    }

    /// Replace the log list with a successful fetch.
    pub fn logs_refreshed(&mut self, entries: Vec<LogEntry>, now: OffsetDateTime) {
        self.logs = entries;
        self.logs_updated_at = Some(now);
        self.clear_note(NoteSource::Logs);
    }

    /// Record a failed fetch. The previous list is kept.
    pub fn logs_failed(&mut self, error: impl Into<String>) {
        self.note = Some(StatusNote {
            source: NoteSource::Logs,
            message: error.into(),
        });
    }

    /// Record a push-channel error.
    pub fn channel_failed(&mut self, error: impl Into<String>) {
        self.note = Some(StatusNote {
            source: NoteSource::Channel,
            message: error.into(),
        });
    }

    fn touch(&mut self, now: OffsetDateTime) -> Option<Liveness> {
        self.last_update = Some(now);
        self.clear_note(NoteSource::Channel);
        self.reevaluate(now)
    }

    fn reevaluate(&mut self, now: OffsetDateTime) -> Option<Liveness> {
        let next = self.evaluator.evaluate(self.last_update, now);
        if next == self.liveness {
            return None;
        }
        self.liveness = next;
        Some(next)
    }

    fn clear_note(&mut self, source: NoteSource) {
        if self.note.as_ref().is_some_and(|n| n.source == source) {
            self.note = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use time::macros::datetime;

    fn t0() -> OffsetDateTime {
        datetime!(2024-05-01 12:00 UTC)
    }

    fn log(id: &str) -> LogEntry {
        LogEntry {
            id: id.into(),
            sensor: "motion".into(),
            message: "Rat seen".into(),
            timestamp: Some(t0()),
        }
    }

    #[test]
    fn test_initial_state() {
        let s = DashboardState::default();
        assert_eq!(s.liveness(), Liveness::Offline);
        assert_eq!(s.alert_state(), AlertState::Standby);
        assert!(s.reading().is_none());
        assert!(s.logs().is_empty());
        assert_eq!(s.age_secs(t0()), None);
    }

    #[test]
    fn test_message_received_goes_online_and_raises() {
        let mut s = DashboardState::default();
        let change = s.message_received("Rat seen", t0());
        assert_eq!(change.liveness, Some(Liveness::Online));
        assert!(matches!(change.alert, Some(AlertTransition::Raised { .. })));
        assert_eq!(s.alert_state(), AlertState::Active);
    }

    #[test]
    fn test_sensor_type_alone_does_not_alert() {
        let mut s = DashboardState::default();
        let change = s.sensor_type_received("motion", t0());
        assert_eq!(change.liveness, Some(Liveness::Online));
        assert!(change.alert.is_none());
        assert_eq!(s.sensor_kind(), SensorKind::Motion);
    }

    #[test]
    fn test_tick_flips_offline_after_silence() {
        let mut s = DashboardState::default();
        s.message_received("Rat seen", t0());
        assert_eq!(s.liveness_tick(t0() + Duration::from_secs(20)), None);
        assert_eq!(
            s.liveness_tick(t0() + Duration::from_secs(25)),
            Some(Liveness::Offline)
        );
        // Alert is independent of liveness
        assert_eq!(s.alert_state(), AlertState::Active);
        assert_eq!(s.age_secs(t0() + Duration::from_secs(25)), Some(25));
    }

    #[test]
    fn test_unchanged_liveness_reports_nothing() {
        let mut s = DashboardState::default();
        s.message_received("Standby", t0());
        let change = s.message_received("Standby", t0() + Duration::from_secs(1));
        assert!(change.is_empty());
    }

    #[test]
    fn test_failed_refresh_keeps_logs() {
        let mut s = DashboardState::default();
        s.logs_refreshed(vec![log("a"), log("b")], t0());
        s.logs_failed("Query failed");
        assert_eq!(s.logs().len(), 2);
        assert_eq!(
            s.status_note().map(|n| n.source),
            Some(NoteSource::Logs)
        );

        s.logs_refreshed(vec![log("c")], t0());
        assert_eq!(s.logs().len(), 1);
        assert!(s.status_note().is_none());
    }

    #[test]
    fn test_channel_note_cleared_by_update() {
        let mut s = DashboardState::default();
        s.channel_failed("stream closed");
        assert!(s.status_note().is_some());
        s.logs_refreshed(Vec::new(), t0());
        assert!(s.status_note().is_some());
        s.message_received("Standby", t0());
        assert!(s.status_note().is_none());
    }
}
