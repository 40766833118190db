//! Score Aggregator
//!
//! Time-smoothed per-flow reward over the score history.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::index_flows;
use crate::logic::error::{EnvError, EnvResult};
use crate::logic::telemetry::FlowId;

/// Per-flow rewards, `values[i]` belongs to `flows[i]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rewards {
    pub flows: Vec<FlowId>,
    pub values: Vec<f32>,
}

impl Rewards {
    pub fn get(&self, flow: &str) -> Option<f32> {
        self.flows.iter().position(|f| f == flow).map(|i| self.values[i])
    }

    pub fn mean(&self) -> f32 {
        if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().sum::<f32>() / self.values.len() as f32
        }
    }
}

/// Scores returned for one step, keyed by the flows they were requested for
#[derive(Debug, Clone)]
pub struct ScoreRecord {
    flows: Vec<FlowId>,
    index: HashMap<FlowId, usize>,
    scores: Vec<f32>,
}

impl ScoreRecord {
    pub fn new(flows: Vec<FlowId>, scores: Vec<f32>) -> EnvResult<Self> {
        if flows.len() != scores.len() {
            return Err(EnvError::Shape(format!(
                "{} flows but {} scores",
                flows.len(),
                scores.len()
            )));
        }
        Ok(Self {
            index: index_flows(&flows),
            flows,
            scores,
        })
    }

    pub fn into_rewards(self) -> Rewards {
        Rewards { flows: self.flows, values: self.scores }
    }
}

/// FIFO of recent score records, paired with the stack window
#[derive(Debug, Clone)]
pub struct ScoreWindow {
    capacity: usize,
    records: VecDeque<ScoreRecord>,
}

impl ScoreWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: ScoreRecord) {
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Occupied slots
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Union of flows across the window with their temporal mean score
    ///
    /// Flows are listed in order of first appearance, oldest slot first. The
    /// divisor is the number of occupied slots, not how often a flow appeared.
    pub fn aggregate(&self) -> Rewards {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut flows: Vec<FlowId> = Vec::new();
        let mut sums: Vec<f32> = Vec::new();

        for record in &self.records {
            for (k, (flow, score)) in record.flows.iter().zip(&record.scores).enumerate() {
                // duplicates inside a record only count once
                if record.index.get(flow) != Some(&k) {
                    continue;
                }
                let pos = *positions.entry(flow.as_str()).or_insert_with(|| {
                    flows.push(flow.clone());
                    sums.push(0.0);
                    flows.len() - 1
                });
                sums[pos] += *score;
            }
        }

        let occupied = self.records.len().max(1) as f32;
        Rewards {
            flows,
            values: sums.into_iter().map(|s| s / occupied).collect(),
        }
    }
}
