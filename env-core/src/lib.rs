//! AIM Sensors environment core
//!
//! Drives a reinforcement-learning agent against the network-defense
//! simulator: flow-keyed frame stacking, paced stepping and per-attack reward
//! calibration.

pub mod constants;
pub mod logic;

pub use logic::calibration::{CoefficientSet, CoefficientStore, JsonFileStore};
pub use logic::config::EnvConfig;
pub use logic::episode::{EpisodeController, Observation, StepOutcome};
pub use logic::error::{EnvError, EnvResult};
pub use logic::telemetry::{HttpConfig, HttpTelemetryClient, TelemetryClient};
