//! Logic Module - Environment core
//!
//! ## Architecture
//! - `telemetry/` - Simulator client boundary (trait, HTTP transport, retry)
//! - `stacking/` - Flow-keyed frame alignment and score aggregation
//! - `calibration/` - Per-attack reward coefficients and their cache
//! - `episode/` - Gym-style reset/step controller

pub mod config;
pub mod error;
pub mod pacing;

pub mod telemetry;
pub mod stacking;
pub mod calibration;
pub mod episode;
