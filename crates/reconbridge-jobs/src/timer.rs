//! Repeating timer driving the poller on the UI thread.

use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Calls a tick function on a fixed period until it asks to stop.
///
/// Runs on whatever task awaits [`RepeatingTimer::run`]; with a current-thread
/// runtime that is the UI thread itself, so ticks never run concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatingTimer {
    period: Duration,
}

impl Default for RepeatingTimer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PERIOD)
    }
}

impl RepeatingTimer {
    /// Default polling period.
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(100);

    /// Shortest period accepted.
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// Creates a timer; periods shorter than [`Self::MIN_PERIOD`] are raised to it.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Self::MIN_PERIOD),
        }
    }

    /// Returns the period between ticks.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Calls `tick` once per period until it returns false.
    ///
    /// The first tick fires immediately. A tick that overruns delays the
    /// following ones instead of bunching them up. Returns the number of
    /// ticks made.
    pub async fn run<F>(&self, mut tick: F) -> u64
    where
        F: FnMut() -> bool,
    {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks = 0;
        loop {
            ticker.tick().await;
            ticks += 1;
            if !tick() {
                return ticks;
            }
        }
    }
}
