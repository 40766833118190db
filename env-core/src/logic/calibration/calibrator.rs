//! Coefficient Calibrator
//!
//! Runs scripted no-op episodes per attack and derives the reward
//! normalization coefficients from the backend's raw counters.

use std::time::Instant;

use super::types::{
    AttackCoefficients, CoefficientSet, CountSample,
    ATTACK_RAW_0, ATTACK_RAW_1, DNS_REPLIES, OTHER_NORMAL, RESOLVED_PACKETS,
};
use crate::constants::SCORE_COUNT_WIDTH;
use crate::logic::error::{EnvError, EnvResult};
use crate::logic::pacing::Pacer;
use crate::logic::telemetry::{retry_when, RetryPolicy, TelemetryClient, TelemetryError};

/// Calibration run parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSettings {
    /// Sampling episodes per round
    pub episodes: usize,
    /// No-op steps per episode
    pub steps: usize,
    /// Rounds per attack before giving up
    pub max_rounds: usize,
}

/// Result of one sampling round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derived {
    pub coefficients: AttackCoefficients,
    pub gamma: f64,
}

pub struct Calibrator<'a> {
    settings: CalibrationSettings,
    pacer: Pacer,
    score_retry: &'a RetryPolicy,
}

impl<'a> Calibrator<'a> {
    pub fn new(settings: CalibrationSettings, pacer: Pacer, score_retry: &'a RetryPolicy) -> Self {
        Self { settings, pacer, score_retry }
    }

    /// Calibrate every attack in order
    ///
    /// gamma in the result is the value derived for the last attack.
    pub fn calibrate<C: TelemetryClient>(&self, client: &mut C, attacks: &[String]) -> EnvResult<CoefficientSet> {
        let mut set = CoefficientSet::new(0.0);

        for attack in attacks {
            let derived = self.calibrate_attack(client, attack)?;
            log::info!("Coefficients for {}: alpha = {}, beta = {}",
                attack, derived.coefficients.a, derived.coefficients.b);
            set.coeff.insert(attack.clone(), derived.coefficients);
            // TODO: gamma is overwritten per attack; confirm whether a cross-attack mean was intended
            set.gamma = derived.gamma;
        }

        set.calibrated_at = Some(chrono::Utc::now());
        Ok(set)
    }

    /// Resample `attack` until both coefficients are non-negative
    pub fn calibrate_attack<C: TelemetryClient>(&self, client: &mut C, attack: &str) -> EnvResult<Derived> {
        for round in 1..=self.settings.max_rounds {
            log::info!("Configuring backend {} for {} (round {}/{})",
                client.address(), attack, round, self.settings.max_rounds);

            let mut samples = Vec::with_capacity(self.settings.episodes);
            for _ in 0..self.settings.episodes {
                let sample = self.sample_episode(client, attack)?;
                log::debug!("{} sample: {:?}", attack, sample);
                samples.push(sample);
            }

            let derived = derive_coefficients(&samples);
            if derived.coefficients.is_usable() {
                return Ok(derived);
            }

            log::warn!("Rejected coefficients for {} (alpha = {}, beta = {}), resampling",
                attack, derived.coefficients.a, derived.coefficients.b);
        }

        Err(EnvError::CalibrationDiverged {
            attack: attack.to_string(),
            rounds: self.settings.max_rounds,
        })
    }

    /// One no-op episode; returns the mean counter vector over its steps
    pub fn sample_episode<C: TelemetryClient>(&self, client: &mut C, attack: &str) -> EnvResult<CountSample> {
        client.reset()?;
        client.start_episode(attack, self.pacer.delay_secs())?;
        let mut flows = client.read_state()?.flows;

        let mut sums = [0.0f64; SCORE_COUNT_WIDTH];
        for _ in 0..self.settings.steps {
            let noop = vec![0usize; flows.len()];
            let t0 = Instant::now();
            client.mutate_action(&flows, &noop)?;
            self.pacer.wait_since(t0);

            let report = retry_when(self.score_retry, "score", TelemetryError::is_retryable_read, || {
                client.read_score(&flows)
            })?;
            flows = client.read_state()?.flows;

            for (sum, count) in sums.iter_mut().zip(report.counts) {
                *sum += count;
            }
        }

        let steps = self.settings.steps.max(1) as f64;
        Ok(sums.map(|s| s / steps))
    }
}

/// Derive alpha, beta and gamma from an `episodes x 5` sample matrix
pub fn derive_coefficients(samples: &[CountSample]) -> Derived {
    // g: resolved packets per DNS reply, one per episode
    let g: Vec<f64> = samples
        .iter()
        .map(|s| s[RESOLVED_PACKETS] / s[DNS_REPLIES])
        .collect();

    let a_normal = mean(samples.iter().map(|s| s[RESOLVED_PACKETS] + s[OTHER_NORMAL]));
    let b_normal = mean(samples.iter().zip(&g).map(|(s, g)| s[DNS_REPLIES] * g));
    let a_attack = mean(samples.iter().map(|s| s[ATTACK_RAW_0]));
    let b_attack = mean(samples.iter().map(|s| s[ATTACK_RAW_1]));

    Derived {
        coefficients: AttackCoefficients {
            a: a_normal / a_attack,
            b: b_normal / b_attack,
        },
        gamma: mean(g.iter().copied()),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}
