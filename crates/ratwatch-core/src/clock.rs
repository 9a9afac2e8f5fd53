//! Time sources for liveness evaluation.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::time::Instant;

/// Source of "now".
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock anchored once and advanced by the tokio monotonic clock.
///
/// Staleness measured with this clock is immune to wall-clock jumps, and it
/// follows `tokio::time::pause`/`advance` in tests.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    wall_anchor: OffsetDateTime,
    mono_anchor: Instant,
}

impl TokioClock {
    /// Anchor a clock at the current time.
    pub fn new() -> Self {
        Self::anchored_at(OffsetDateTime::now_utc())
    }

    /// Anchor a clock so that "now" reads `wall` at this instant.
    pub fn anchored_at(wall: OffsetDateTime) -> Self {
        Self {
            wall_anchor: wall,
            mono_anchor: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> OffsetDateTime {
        self.wall_anchor + self.mono_anchor.elapsed()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> OffsetDateTime {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use time::macros::datetime;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_paused_time() {
        let start = datetime!(2024-05-01 12:00 UTC);
        let clock = TokioClock::anchored_at(start);
        assert_eq!(clock.now(), start);

        tokio::time::advance(Duration::from_secs(25)).await;
        assert_eq!(clock.now(), start + Duration::from_secs(25));
    }
}
