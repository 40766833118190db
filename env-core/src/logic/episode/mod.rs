//! Episode Module - Gym-style environment over the simulator
//!
//! `EpisodeController` owns the reset -> start-episode -> step lifecycle,
//! paces every step and hands out stacked observations and smoothed rewards.

pub mod controller;
#[cfg(test)]
mod tests;

pub use controller::EpisodeController;

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::logic::stacking::Rewards;
use crate::logic::telemetry::{FlowId, FlowStats};

/// Observation handed to the learner
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// `[flows, frame_size]` (stack size 1)
    Flat(Array2<f32>),
    /// `[flows, stack_size, frame_size]`
    Stacked(Array3<f32>),
}

impl Observation {
    pub fn shape(&self) -> &[usize] {
        match self {
            Observation::Flat(a) => a.shape(),
            Observation::Stacked(a) => a.shape(),
        }
    }

    pub fn num_flows(&self) -> usize {
        self.shape()[0]
    }

    pub fn as_flat(&self) -> Option<&Array2<f32>> {
        match self {
            Observation::Flat(a) => Some(a),
            Observation::Stacked(_) => None,
        }
    }

    pub fn as_stacked(&self) -> Option<&Array3<f32>> {
        match self {
            Observation::Stacked(a) => Some(a),
            Observation::Flat(_) => None,
        }
    }
}

/// Per-flow observation shape (excluding the flow axis)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpace {
    pub stack_size: usize,
    pub frame_size: usize,
}

impl ObservationSpace {
    pub fn shape(&self) -> Vec<usize> {
        if self.stack_size > 1 {
            vec![self.stack_size, self.frame_size]
        } else {
            vec![self.frame_size]
        }
    }
}

/// Flow counters from the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    pub n_normal: f64,
    pub n_attack: f64,
    pub n_infected: usize,
}

impl From<&FlowStats> for StepStats {
    fn from(stats: &FlowStats) -> Self {
        Self {
            n_normal: stats.normal_flow_counts,
            n_attack: stats.attack_flow_counts,
            n_infected: stats.infected_devices.len(),
        }
    }
}

/// Diagnostics for one step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Flows the observation rows belong to
    pub flows: Vec<FlowId>,
    pub stats: StepStats,
}

/// Result of a single environment step
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub rewards: Rewards,
    /// Always false; episode length is up to the training loop
    pub done: bool,
    pub info: StepInfo,
}
