//! Retry Policy
//!
//! Bounded exponential backoff for backend calls that may fail while the
//! simulator is still coming up or momentarily overloaded.

use std::time::Duration;

use super::TelemetryError;
use crate::logic::error::{EnvError, EnvResult};

/// Backoff schedule for one kind of backend call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: usize,
    /// Sleep after the first failure
    pub initial_backoff: Duration,
    /// Upper bound for any single sleep
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Construction-time readiness checks (backend may still be booting)
    pub fn readiness() -> Self {
        Self {
            max_attempts: 30,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }

    /// Per-step score reads
    pub fn score_read() -> Self {
        Self {
            max_attempts: 50,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
        }
    }

    /// No sleeping at all (tests)
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Sleep before attempt `attempt + 1`, where `attempt` failures happened so far
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

/// Run `op` until it succeeds, fails permanently, or the budget runs out
///
/// Only transient errors are retried; anything else is returned immediately.
pub fn retry_transient<T, F>(policy: &RetryPolicy, operation: &str, op: F) -> EnvResult<T>
where
    F: FnMut() -> Result<T, TelemetryError>,
{
    retry_when(policy, operation, TelemetryError::is_transient, op)
}

/// Like `retry_transient`, with the caller deciding which errors are retried
pub fn retry_when<T, F, P>(policy: &RetryPolicy, operation: &str, retryable: P, mut op: F) -> EnvResult<T>
where
    F: FnMut() -> Result<T, TelemetryError>,
    P: Fn(&TelemetryError) -> bool,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => {
                if attempt > 1 {
                    log::info!("'{}' succeeded after {} attempts", operation, attempt);
                }
                return Ok(value);
            }
            Err(e) if retryable(&e) => {
                if attempt >= policy.max_attempts {
                    log::error!("'{}' failed {} times, giving up: {}", operation, attempt, e);
                    return Err(EnvError::BackendUnavailable {
                        operation: operation.to_string(),
                        attempts: attempt,
                    });
                }
                let wait = policy.backoff(attempt);
                log::warn!("'{}' failed ({}), retrying in {:?}", operation, e, wait);
                if !wait.is_zero() {
                    std::thread::sleep(wait);
                }
            }
            Err(e) => return Err(EnvError::Telemetry(e)),
        }
    }
}
