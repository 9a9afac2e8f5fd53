//! Platform-agnostic types for the ratwatch sensor dashboard.
//!
//! This crate provides the shared data model used by the derivation engine
//! (ratwatch-core) and the front ends (ratwatch-cli).
//!
//! # Features
//!
//! - Live reading and log entry types
//! - Alert classification against the standby sentinels
//! - Sensor kind lookup for icons, colours and notification titles
//! - Timestamp helpers for backend records
//!
//! # Example
//!
//! ```
//! use ratwatch_types::{AlertState, SensorKind};
//!
//! assert!(AlertState::from_message("Rat seen").is_active());
//! assert_eq!(SensorKind::from_sensor_type("Motion"), SensorKind::Motion);
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    AlertState, Liveness, LogEntry, STANDBY_SENTINELS, SensorKind, SensorReading, from_epoch,
    parse_rfc3339,
};


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn alert_active_iff_not_sentinel(message in ".{0,40}") {
            let active = AlertState::from_message(&message).is_active();
            prop_assert_eq!(active, !STANDBY_SENTINELS.contains(&message.as_str()));
        }

        #[test]
        fn sensor_kind_ignores_case(sensor in "[a-zA-Z0-9 _-]{0,24}") {
            prop_assert_eq!(
                SensorKind::from_sensor_type(&sensor.to_uppercase()),
                SensorKind::from_sensor_type(&sensor.to_lowercase())
            );
        }
    }
}
