//! Environment configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::constants;
use super::error::{EnvError, EnvResult};
use super::telemetry::RetryPolicy;

/// Everything needed to build one environment instance
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Simulator address (host:port)
    pub backend_addr: String,

    /// Attack scenarios episodes may start with
    pub attack_vectors: Vec<String>,

    /// Directory of the per-host coefficient cache
    pub cfg_dir: PathBuf,

    /// Minimum time between an action and the following telemetry read
    pub delay: Duration,

    /// Calibration episodes per attack (0 = trust the cache)
    pub cfg_episodes: usize,

    /// No-op steps per calibration episode
    pub cfg_steps: usize,

    /// Frames per stacked observation (1 = no stacking)
    pub stack_size: usize,

    /// Resampling rounds per attack before calibration gives up
    pub max_calibration_rounds: usize,

    /// Backoff for construction-time readiness and configuration calls
    pub readiness_retry: RetryPolicy,

    /// Backoff for per-step score reads
    pub score_retry: RetryPolicy,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            backend_addr: constants::DEFAULT_BACKEND_ADDR.to_string(),
            attack_vectors: constants::DEFAULT_ATTACK_VECTORS.iter().map(|s| s.to_string()).collect(),
            cfg_dir: PathBuf::from(constants::DEFAULT_CFG_DIR),
            delay: Duration::from_millis(constants::DEFAULT_STEP_DELAY_MS),
            cfg_episodes: constants::DEFAULT_CFG_EPISODES,
            cfg_steps: constants::DEFAULT_CFG_STEPS,
            stack_size: constants::DEFAULT_STACK_SIZE,
            max_calibration_rounds: constants::DEFAULT_MAX_CALIBRATION_ROUNDS,
            readiness_retry: RetryPolicy::readiness(),
            score_retry: RetryPolicy::score_read(),
        }
    }
}

impl EnvConfig {
    /// Load configuration from `AIM_*` environment variables
    pub fn from_env() -> Self {
        Self {
            backend_addr: constants::get_backend_addr(),
            attack_vectors: constants::get_attack_vectors(),
            cfg_dir: PathBuf::from(constants::get_cfg_dir()),
            delay: Duration::from_millis(constants::get_step_delay_ms()),
            cfg_episodes: constants::get_cfg_episodes(),
            cfg_steps: constants::get_cfg_steps(),
            stack_size: constants::get_stack_size(),
            max_calibration_rounds: constants::get_max_calibration_rounds(),
            ..Default::default()
        }
    }

    /// Reject configurations that can never produce a usable environment
    pub fn validate(&self) -> EnvResult<()> {
        if self.attack_vectors.is_empty() {
            return Err(EnvError::Config("attack vector list is empty".to_string()));
        }
        if self.stack_size == 0 {
            return Err(EnvError::Config("stack_size must be at least 1".to_string()));
        }
        if self.cfg_steps == 0 {
            return Err(EnvError::Config("cfg_steps must be at least 1".to_string()));
        }
        if self.max_calibration_rounds == 0 {
            return Err(EnvError::Config("max_calibration_rounds must be at least 1".to_string()));
        }
        if self.readiness_retry.max_attempts == 0 || self.score_retry.max_attempts == 0 {
            return Err(EnvError::Config("retry budgets must allow at least one attempt".to_string()));
        }
        Ok(())
    }

    pub fn has_attack(&self, attack: &str) -> bool {
        self.attack_vectors.iter().any(|a| a == attack)
    }
}
