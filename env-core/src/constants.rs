//! Central Configuration Constants
//!
//! Single source of truth for all environment defaults.
//! Every value can be overridden through an `AIM_*` environment variable.

/// Default simulator backend address (host:port)
pub const DEFAULT_BACKEND_ADDR: &str = "192.168.176.10:5000";

/// Attack scenarios the simulator knows how to inject
pub const DEFAULT_ATTACK_VECTORS: &[&str] = &[
    "botnet_attack",
    "exfiltration_attack",
    "scan_attack",
    "exploit_attack",
    "slowloris_attack",
];

/// Directory holding one coefficient cache file per backend host
pub const DEFAULT_CFG_DIR: &str = "environment_coefficients";

/// Minimum wall-clock duration of one step (milliseconds)
pub const DEFAULT_STEP_DELAY_MS: u64 = 100;

/// Calibration episodes requested by default (0 = use the cache when present)
pub const DEFAULT_CFG_EPISODES: usize = 0;

/// Calibration episodes forced when no usable cache exists
pub const MIN_CFG_EPISODES_WITHOUT_CACHE: usize = 2;

/// No-op steps per calibration episode
pub const DEFAULT_CFG_STEPS: usize = 100;

/// Frames stacked into one observation
pub const DEFAULT_STACK_SIZE: usize = 1;

/// Resampling rounds allowed per attack before calibration is declared diverged
pub const DEFAULT_MAX_CALIBRATION_ROUNDS: usize = 10;

/// HTTP request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Width of the per-step count vector returned by the score endpoint
pub const SCORE_COUNT_WIDTH: usize = 5;

/// Episodes run by the `aim-env` driver
pub const DEFAULT_DRIVER_EPISODES: usize = 10;

/// Steps per driver episode
pub const DEFAULT_DRIVER_EPISODE_STEPS: usize = 200;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get backend address from environment or use default
pub fn get_backend_addr() -> String {
    std::env::var("AIM_BACKEND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BACKEND_ADDR.to_string())
}

/// Get attack vectors (comma separated) from environment or use default
pub fn get_attack_vectors() -> Vec<String> {
    match std::env::var("AIM_ATTACK_VECTORS") {
        Ok(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => DEFAULT_ATTACK_VECTORS.iter().map(|s| s.to_string()).collect(),
    }
}

/// Get coefficient cache directory from environment or use default
pub fn get_cfg_dir() -> String {
    std::env::var("AIM_CFG_DIR")
        .unwrap_or_else(|_| DEFAULT_CFG_DIR.to_string())
}

/// Get step delay from environment or use default
pub fn get_step_delay_ms() -> u64 {
    env_or("AIM_STEP_DELAY_MS", DEFAULT_STEP_DELAY_MS)
}

/// Get requested calibration episodes from environment or use default
pub fn get_cfg_episodes() -> usize {
    env_or("AIM_CFG_EPISODES", DEFAULT_CFG_EPISODES)
}

/// Get calibration steps per episode from environment or use default
pub fn get_cfg_steps() -> usize {
    env_or("AIM_CFG_STEPS", DEFAULT_CFG_STEPS)
}

/// Get stack size from environment or use default
pub fn get_stack_size() -> usize {
    env_or("AIM_STACK_SIZE", DEFAULT_STACK_SIZE)
}

/// Get calibration round budget from environment or use default
pub fn get_max_calibration_rounds() -> usize {
    env_or("AIM_MAX_CALIBRATION_ROUNDS", DEFAULT_MAX_CALIBRATION_ROUNDS)
}

/// Get driver episode count from environment or use default
pub fn get_driver_episodes() -> usize {
    env_or("AIM_EPISODES", DEFAULT_DRIVER_EPISODES)
}

/// Get driver steps per episode from environment or use default
pub fn get_driver_episode_steps() -> usize {
    env_or("AIM_EPISODE_STEPS", DEFAULT_DRIVER_EPISODE_STEPS)
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
