//! Calibration Module - Per-attack reward normalization
//!
//! Estimates alpha/beta per attack scenario (and a DNS ratio gamma) so that
//! reward magnitude is comparable across attacks of very different traffic
//! volume.
//!
//! # Architecture
//! - `types.rs`: `CoefficientSet`, `AttackCoefficients`
//! - `calibrator.rs`: sampling episodes + coefficient derivation
//! - `store.rs`: `CoefficientStore` trait, JSON file cache
//!
//! # Failure Strategy
//! Missing, empty or malformed cache -> calibrate and rewrite it.

pub mod types;
pub mod calibrator;
pub mod store;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

pub use types::{AttackCoefficients, CoefficientSet, CountSample};
pub use calibrator::{derive_coefficients, CalibrationSettings, Calibrator, Derived};
pub use store::{CoefficientStore, JsonFileStore};

use crate::constants::MIN_CFG_EPISODES_WITHOUT_CACHE;
use crate::logic::config::EnvConfig;
use crate::logic::error::EnvResult;
use crate::logic::pacing::Pacer;
use crate::logic::telemetry::{host_of, TelemetryClient};

// ============================================================================
// STATE
// ============================================================================

/// One lock per backend host; calibration against a host is not re-entrant
static HOST_LOCKS: Lazy<Mutex<HashMap<String, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Lock serializing calibration for `host` within this process
pub fn host_lock(host: &str) -> Arc<Mutex<()>> {
    HOST_LOCKS
        .lock()
        .entry(host.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Hand back a lock from `host_lock`; the entry is dropped once unused
pub fn release_host_lock(host: &str, lock: Arc<Mutex<()>>) {
    let mut locks = HOST_LOCKS.lock();
    // registry + `lock` are the only holders
    if Arc::strong_count(&lock) == 2 {
        locks.remove(host);
    }
}

#[cfg(test)]
fn is_registered(host: &str) -> bool {
    HOST_LOCKS.lock().contains_key(host)
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Episodes to run given the request and what the cache holds
///
/// An unusable cache forces at least two episodes; an explicit request
/// recalibrates even when the cache is fine.
pub fn effective_episodes(requested: usize, cached: Option<&CoefficientSet>) -> usize {
    match cached {
        Some(_) => requested,
        None => requested.max(MIN_CFG_EPISODES_WITHOUT_CACHE),
    }
}

/// Cached coefficients for the client's host, calibrating when needed
pub fn ensure_coefficients<C: TelemetryClient>(
    client: &mut C,
    store: &dyn CoefficientStore,
    config: &EnvConfig,
) -> EnvResult<CoefficientSet> {
    let host = host_of(client.address()).to_string();
    let lock = host_lock(&host);
    let result = {
        let _guard = lock.lock();
        load_or_calibrate(client, store, config, &host)
    };
    release_host_lock(&host, lock);
    result
}

fn load_or_calibrate<C: TelemetryClient>(
    client: &mut C,
    store: &dyn CoefficientStore,
    config: &EnvConfig,
    host: &str,
) -> EnvResult<CoefficientSet> {
    let cached = store.load(host);
    let episodes = effective_episodes(config.cfg_episodes, cached.as_ref());

    if episodes == 0 {
        if let Some(set) = cached {
            let missing = set.missing(&config.attack_vectors);
            if !missing.is_empty() {
                log::warn!("Cached coefficients for {} lack attacks: {}", host, missing.join(", "));
            }
            return Ok(set);
        }
    }

    let calibrator = Calibrator::new(
        CalibrationSettings {
            episodes,
            steps: config.cfg_steps,
            max_rounds: config.max_calibration_rounds,
        },
        Pacer::new(config.delay),
        &config.score_retry,
    );
    let set = calibrator.calibrate(client, &config.attack_vectors)?;

    if let Err(e) = store.save(host, &set) {
        log::error!("Failed to persist coefficients for {}: {}", host, e);
    }

    Ok(set)
}
