//! Clock utilities for a generate run.
//!
//! Every recording session is anchored to a monotonic epoch taken when the
//! session is created, together with the wall-clock time at that moment.
//! The wall-clock half stamps the upload form; the monotonic half is used
//! for elapsed-time logging.

use std::time::{Duration, Instant};

/// A recording clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment the session started).
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant the session started.
    epoch: Instant,

    /// Wall-clock time at epoch.
    epoch_wall: chrono::DateTime<chrono::Utc>,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now(),
        }
    }

    /// Time elapsed since the session started.
    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Wall-clock time at session start (RFC 3339).
    pub fn epoch_wall(&self) -> String {
        self.epoch_wall.to_rfc3339()
    }

    /// Convert a duration to whole nanoseconds, saturating at `u64::MAX`.
    pub fn duration_to_ns(duration: Duration) -> u64 {
        u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = RecordingClock::start();
        assert!(clock.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_epoch_wall_is_rfc3339() {
        let clock = RecordingClock::start();
        assert!(chrono::DateTime::parse_from_rfc3339(&clock.epoch_wall()).is_ok());
    }

    #[test]
    fn test_duration_to_ns() {
        assert_eq!(
            RecordingClock::duration_to_ns(Duration::from_millis(1500)),
            1_500_000_000
        );
        assert_eq!(
            RecordingClock::duration_to_ns(Duration::MAX),
            u64::MAX
        );
    }
}
