//! Device liveness evaluation.
//!
//! The rig has no heartbeat and the push channel does not report
//! disconnects, so liveness is inferred from silence: a device is online
//! while the last received update is no older than the threshold.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ratwatch_core::LivenessEvaluator;
//! use ratwatch_types::Liveness;
//! use time::OffsetDateTime;
//!
//! let evaluator = LivenessEvaluator::default();
//! let now = OffsetDateTime::now_utc();
//!
//! assert_eq!(evaluator.evaluate(None, now), Liveness::Offline);
//! assert_eq!(evaluator.evaluate(Some(now - Duration::from_secs(5)), now), Liveness::Online);
//! assert_eq!(evaluator.evaluate(Some(now - Duration::from_secs(25)), now), Liveness::Offline);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use ratwatch_types::Liveness;

use crate::error::{Error, Result};

/// Default maximum silence before a device is offline.
pub const DEFAULT_THRESHOLD: Duration = Duration::from_secs(20);

/// Default interval between liveness checks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(3);

/// Configuration for liveness evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessConfig {
    /// Maximum allowed silence. Inclusive: exactly this old is still online.
    pub threshold: Duration,
    /// How often liveness is re-evaluated without new readings.
    pub check_interval: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

impl LivenessConfig {
    /// Validate the configuration.
    ///
    /// The check interval must be non-zero and no longer than the threshold,
    /// otherwise an offline transition could be reported late by more than a
    /// full threshold.
    pub fn validate(&self) -> Result<()> {
        if self.check_interval.is_zero() {
            return Err(Error::invalid_config("liveness check interval must be > 0"));
        }
        if self.threshold.is_zero() {
            return Err(Error::invalid_config("liveness threshold must be > 0"));
        }
        if self.check_interval > self.threshold {
            return Err(Error::invalid_config(format!(
                "liveness check interval ({:?}) must not exceed the threshold ({:?})",
                self.check_interval, self.threshold
            )));
        }
        Ok(())
    }
}

/// Evaluates liveness from the last receipt timestamp.
#[derive(Debug, Clone, Default)]
pub struct LivenessEvaluator {
    config: LivenessConfig,
}

impl LivenessEvaluator {
    /// Create an evaluator with the given configuration.
    pub fn new(config: LivenessConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &LivenessConfig {
        &self.config
    }

    /// Evaluate liveness.
    ///
    /// No timestamp means offline. A timestamp in the future (clock skew)
    /// counts as online.
    pub fn evaluate(&self, last_update: Option<OffsetDateTime>, now: OffsetDateTime) -> Liveness {
        let Some(last) = last_update else {
            return Liveness::Offline;
        };
        let threshold =
            time::Duration::try_from(self.config.threshold).unwrap_or(time::Duration::MAX);
        Liveness::from(now - last <= threshold)
    }

    /// Whole seconds since the last update, floored; `None` if never updated.
    ///
    /// Updates stamped in the future read as zero.
    pub fn age_secs(&self, last_update: Option<OffsetDateTime>, now: OffsetDateTime) -> Option<u64> {
        last_update.map(|last| {
            let elapsed = now - last;
            u64::try_from(elapsed.whole_seconds()).unwrap_or(0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn now() -> OffsetDateTime {
        datetime!(2024-05-01 12:00 UTC)
    }

    #[test]
    fn test_never_updated_is_offline() {
        let e = LivenessEvaluator::default();
        assert_eq!(e.evaluate(None, now()), Liveness::Offline);
        assert_eq!(e.age_secs(None, now()), None);
    }

    #[test]
    fn test_recent_update_is_online() {
        let e = LivenessEvaluator::default();
        assert_eq!(e.evaluate(Some(now()), now()), Liveness::Online);
        assert_eq!(
            e.evaluate(Some(now() - Duration::from_secs(19)), now()),
            Liveness::Online
        );
    }

    #[test]
    fn test_threshold_boundary() {
        let e = LivenessEvaluator::default();
        // Exactly the threshold is still online
        assert_eq!(
            e.evaluate(Some(now() - Duration::from_secs(20)), now()),
            Liveness::Online
        );
        // One millisecond past is offline
        assert_eq!(
            e.evaluate(Some(now() - Duration::from_millis(20_001)), now()),
            Liveness::Offline
        );
    }

    #[test]
    fn test_stale_update_is_offline() {
        let e = LivenessEvaluator::default();
        assert_eq!(
            e.evaluate(Some(now() - Duration::from_secs(25)), now()),
            Liveness::Offline
        );
    }

    #[test]
    fn test_future_timestamp_is_online() {
        let e = LivenessEvaluator::default();
        assert_eq!(
            e.evaluate(Some(now() + Duration::from_secs(60)), now()),
            Liveness::Online
        );
        assert_eq!(e.age_secs(Some(now() + Duration::from_secs(60)), now()), Some(0));
    }

    #[test]
    fn test_custom_threshold() {
        let e = LivenessEvaluator::new(LivenessConfig {
            threshold: Duration::from_secs(5),
            check_interval: Duration::from_secs(1),
        });
        assert_eq!(
            e.evaluate(Some(now() - Duration::from_secs(6)), now()),
            Liveness::Offline
        );
    }

    #[test]
    fn test_age_secs_floors() {
        let e = LivenessEvaluator::default();
        assert_eq!(
            e.age_secs(Some(now() - Duration::from_millis(7_900)), now()),
            Some(7)
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(LivenessConfig::default().validate().is_ok());

        let zero = LivenessConfig {
            check_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let slow = LivenessConfig {
            threshold: Duration::from_secs(2),
            check_interval: Duration::from_secs(3),
        };
        assert!(slow.validate().is_err());
    }
}
