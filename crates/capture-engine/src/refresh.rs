//! Display-refresh pacing.
//!
//! Scene holds are written as "wait for the next refresh tick until the
//! deadline has passed". The tick source is a trait so tests can drive it
//! with tokio's paused clock.

use std::time::Duration;

use async_trait::async_trait;
use scenereel_common::error::ReelResult;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// A monotonic clock with a periodic tick.
#[async_trait]
pub trait RefreshSource: Send {
    /// Time since the source was created.
    fn now(&self) -> Duration;

    /// Wait for the next tick and return the time it was observed.
    async fn next_frame(&mut self) -> Duration;
}

/// Tick source backed by `tokio::time::interval`.
#[derive(Debug)]
pub struct TokioRefresh {
    origin: Instant,
    interval: Interval,
}

impl TokioRefresh {
    /// Tick `fps` times per second. Missed ticks are skipped, not bursted.
    pub fn new(fps: u32) -> Self {
        let period = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
        let origin = Instant::now();
        let mut interval = tokio::time::interval_at(origin + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { origin, interval }
    }
}

#[async_trait]
impl RefreshSource for TokioRefresh {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn next_frame(&mut self) -> Duration {
        // The scheduled instant can lag behind `now()` after a slow draw.
        self.interval.tick().await;
        self.origin.elapsed()
    }
}

/// Suspend until `refresh.now() >= deadline`, calling `on_tick` with the
/// tick time on every refresh in between. Returns the number of ticks.
///
/// A deadline that has already passed returns immediately without ticking.
pub async fn hold_until<R, F>(refresh: &mut R, deadline: Duration, mut on_tick: F) -> ReelResult<u64>
where
    R: RefreshSource + ?Sized,
    F: FnMut(Duration) -> ReelResult<()>,
{
    let mut ticks = 0;
    while refresh.now() < deadline {
        let now = refresh.next_frame().await;
        on_tick(now)?;
        ticks += 1;
    }
    Ok(ticks)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Advances by a fixed step on every tick, no real waiting.
    struct StepRefresh {
        now: Duration,
        step: Duration,
    }

    #[async_trait]
    impl RefreshSource for StepRefresh {
        fn now(&self) -> Duration {
            self.now
        }

        async fn next_frame(&mut self) -> Duration {
            self.now += self.step;
            self.now
        }
    }

    #[tokio::test]
    async fn test_hold_ticks_until_deadline() {
        let mut refresh = StepRefresh {
            now: Duration::ZERO,
            step: Duration::from_millis(100),
        };
        let mut seen = Vec::new();
        let ticks = hold_until(&mut refresh, Duration::from_millis(250), |t| {
            seen.push(t.as_millis());
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(ticks, 3);
        assert_eq!(seen, vec![100, 200, 300]);
        assert!(refresh.now() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_hold_with_past_deadline_does_not_tick() {
        let mut refresh = StepRefresh {
            now: Duration::from_secs(5),
            step: Duration::from_millis(16),
        };
        let ticks = hold_until(&mut refresh, Duration::from_secs(1), |_| Ok(()))
            .await
            .unwrap();
        assert_eq!(ticks, 0);
    }

    #[tokio::test]
    async fn test_hold_stops_on_tick_error() {
        let mut refresh = StepRefresh {
            now: Duration::ZERO,
            step: Duration::from_millis(10),
        };
        let result = hold_until(&mut refresh, Duration::from_secs(1), |t| {
            if t >= Duration::from_millis(30) {
                Err(scenereel_common::error::ReelError::capture("boom"))
            } else {
                Ok(())
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(refresh.now(), Duration::from_millis(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_refresh_ticks_at_frame_rate() {
        let mut refresh = TokioRefresh::new(10);
        let first = refresh.next_frame().await;
        let second = refresh.next_frame().await;
        assert_eq!(first, Duration::from_millis(100));
        assert_eq!(second, Duration::from_millis(200));
    }
}
