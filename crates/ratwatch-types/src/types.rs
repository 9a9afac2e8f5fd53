//! Core types for ratwatch sensor data.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{ParseError, ParseResult};

/// Messages that mean "nothing is happening".
///
/// Matching is exact and case-sensitive: `"standby"` is an alert.
pub const STANDBY_SENTINELS: [&str; 3] = ["", "Standby", "Standby..."];

/// Epoch values above this are taken to be milliseconds rather than seconds.
///
/// 10^11 seconds is far past year 5000, while 10^11 milliseconds is 1973.
const EPOCH_MILLIS_CUTOFF: i64 = 100_000_000_000;

/// Whether the rig is currently reporting an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AlertState {
    /// The message is one of the [`STANDBY_SENTINELS`].
    #[default]
    Standby,
    /// Any other message.
    Active,
}

impl AlertState {
    /// Classify a status message.
    ///
    /// Depends on the message alone; sensor type and staleness play no part.
    ///
    /// # Examples
    ///
    /// ```
    /// use ratwatch_types::AlertState;
    ///
    /// assert_eq!(AlertState::from_message("Standby..."), AlertState::Standby);
    /// assert_eq!(AlertState::from_message("Rat seen"), AlertState::Active);
    /// assert_eq!(AlertState::from_message("standby"), AlertState::Active);
    /// ```
    #[must_use]
    pub fn from_message(message: &str) -> Self {
        if STANDBY_SENTINELS.contains(&message) {
            AlertState::Standby
        } else {
            AlertState::Active
        }
    }

    /// True for [`AlertState::Active`].
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, AlertState::Active)
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertState::Standby => write!(f, "Standby"),
            AlertState::Active => write!(f, "Alert"),
        }
    }
}

/// Derived device liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Liveness {
    /// A reading arrived within the liveness threshold.
    Online,
    /// Nothing arrived within the threshold, or nothing ever arrived.
    #[default]
    Offline,
}

impl Liveness {
    /// True for [`Liveness::Online`].
    #[must_use]
    pub fn is_online(&self) -> bool {
        matches!(self, Liveness::Online)
    }
}

impl From<bool> for Liveness {
    fn from(online: bool) -> Self {
        if online {
            Liveness::Online
        } else {
            Liveness::Offline
        }
    }
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Liveness::Online => write!(f, "Online"),
            Liveness::Offline => write!(f, "Offline"),
        }
    }
}

/// Family of sensor that produced a reading.
///
/// Used for icon and colour selection and for notification titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SensorKind {
    /// PIR or camera motion trigger.
    Motion,
    /// Ultrasonic repellant emitter.
    Repellant,
    /// Anything else.
    Other,
}

impl SensorKind {
    /// Detect the sensor kind from a sensor-type string.
    ///
    /// Case-insensitive substring match.
    ///
    /// # Examples
    ///
    /// ```
    /// use ratwatch_types::SensorKind;
    ///
    /// assert_eq!(SensorKind::from_sensor_type("MOTION-1"), SensorKind::Motion);
    /// assert_eq!(SensorKind::from_sensor_type("motion-1"), SensorKind::Motion);
    /// assert_eq!(SensorKind::from_sensor_type("Repellant"), SensorKind::Repellant);
    /// assert_eq!(SensorKind::from_sensor_type("ir"), SensorKind::Other);
    /// ```
    #[must_use]
    pub fn from_sensor_type(sensor_type: &str) -> Self {
        let lower = sensor_type.to_lowercase();
        if lower.contains("motion") {
            SensorKind::Motion
        } else if lower.contains("repellant") {
            SensorKind::Repellant
        } else {
            SensorKind::Other
        }
    }

    /// Single-glyph icon for this kind.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            SensorKind::Motion => "◉",
            SensorKind::Repellant => "≋",
            SensorKind::Other => "●",
        }
    }

    /// Accent colour as RGB components.
    #[must_use]
    pub fn color_rgb(&self) -> (u8, u8, u8) {
        match self {
            SensorKind::Motion => (250, 204, 21),
            SensorKind::Repellant => (96, 165, 250),
            SensorKind::Other => (74, 222, 128),
        }
    }

    /// Title used for alert notifications from this kind of sensor.
    #[must_use]
    pub fn notification_title(&self) -> &'static str {
        match self {
            SensorKind::Motion => "Rat Detected!",
            SensorKind::Repellant => "Repellant Activated!",
            SensorKind::Other => "Sensor Alert",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Motion => write!(f, "Motion"),
            SensorKind::Repellant => write!(f, "Repellant"),
            SensorKind::Other => write!(f, "Sensor"),
        }
    }
}

/// Latest live state published by the rig.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    /// Current status message, e.g. `"Standby"` or `"Rat seen"`.
    pub message: String,
    /// Current sensor type, e.g. `"motion"`.
    pub sensor_type: String,
    /// When the most recent field update was received locally.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub received_at: OffsetDateTime,
}

impl SensorReading {
    /// Create a reading received at `received_at`.
    pub fn new(
        message: impl Into<String>,
        sensor_type: impl Into<String>,
        received_at: OffsetDateTime,
    ) -> Self {
        Self {
            message: message.into(),
            sensor_type: sensor_type.into(),
            received_at,
        }
    }

    /// Alert classification of the message.
    #[must_use]
    pub fn alert_state(&self) -> AlertState {
        AlertState::from_message(&self.message)
    }

    /// Sensor kind derived from the sensor type.
    #[must_use]
    pub fn kind(&self) -> SensorKind {
        SensorKind::from_sensor_type(&self.sensor_type)
    }
}

/// One record from the sensor log collection.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LogEntry {
    /// Document identifier.
    pub id: String,
    /// Sensor that wrote the record.
    pub sensor: String,
    /// Recorded message.
    pub message: String,
    /// Server-side timestamp, if the record carried one.
    #[cfg_attr(
        feature = "serde",
        serde(default, with = "time::serde::rfc3339::option")
    )]
    pub timestamp: Option<OffsetDateTime>,
}

impl LogEntry {
    /// Sensor kind derived from the `sensor` field.
    #[must_use]
    pub fn kind(&self) -> SensorKind {
        SensorKind::from_sensor_type(&self.sensor)
    }

    /// `[SENSOR] message` as shown in log lists.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("[{}] {}", self.sensor.to_uppercase(), self.message)
    }
}

/// Parse an RFC 3339 timestamp.
///
/// # Examples
///
/// ```
/// use ratwatch_types::parse_rfc3339;
///
/// let ts = parse_rfc3339("2024-05-01T12:00:00Z").unwrap();
/// assert_eq!(ts.unix_timestamp(), 1_714_564_800);
/// assert!(parse_rfc3339("yesterday").is_err());
/// ```
pub fn parse_rfc3339(value: &str) -> ParseResult<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|e| ParseError::InvalidTimestamp(format!("{value:?}: {e}")))
}

/// Interpret a Unix epoch value in either seconds or milliseconds.
///
/// Values above 10^11 are taken as milliseconds.
///
/// # Examples
///
/// ```
/// use ratwatch_types::from_epoch;
///
/// let secs = from_epoch(1_714_564_800).unwrap();
/// let millis = from_epoch(1_714_564_800_000).unwrap();
/// assert_eq!(secs, millis);
/// ```
pub fn from_epoch(value: i64) -> ParseResult<OffsetDateTime> {
    let nanos = if value.unsigned_abs() > EPOCH_MILLIS_CUTOFF.unsigned_abs() {
        i128::from(value) * 1_000_000
    } else {
        i128::from(value) * 1_000_000_000
    };
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|e| ParseError::InvalidTimestamp(format!("{value}: {e}")))
}
