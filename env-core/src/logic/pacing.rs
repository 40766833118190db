//! Step Pacing
//!
//! Guarantees the backend never sees two telemetry reads closer than the
//! configured delay after an action, so the simulated network has time to
//! react.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacer {
    delay: Duration,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Delay as sent to `start_episode`
    pub fn delay_secs(&self) -> f64 {
        self.delay.as_secs_f64()
    }

    /// Block until `t0 + delay`; returns how long we slept
    pub fn wait_since(&self, t0: Instant) -> Duration {
        let deadline = t0 + self.delay;
        let now = Instant::now();
        if now >= deadline {
            return Duration::ZERO;
        }
        let remaining = deadline - now;
        std::thread::sleep(remaining);
        remaining
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::constants::DEFAULT_STEP_DELAY_MS))
    }
}
