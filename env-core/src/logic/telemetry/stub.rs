//! Scripted in-memory backend for tests

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use super::{ActionSpace, FlowId, FlowStats, ScoreReport, StateSnapshot, TelemetryClient, TelemetryError};

/// Backend that replays scripted frames and records every call
pub struct ScriptedBackend {
    pub address: String,
    /// Served in order; the last frame repeats forever
    pub frames: VecDeque<StateSnapshot>,
    pub actions: ActionSpace,
    /// Score per flow (missing flows score 0)
    pub flow_scores: HashMap<FlowId, f32>,
    /// Count vector per episode (indexed by reset count, last one repeats)
    pub episode_counts: Vec<[f64; 5]>,
    /// Transient failures to inject before the next score read succeeds
    pub score_failures: usize,
    /// Unparseable score bodies to return after `score_failures` run out
    pub garbled_scores: usize,
    /// Transient failures to inject before the next state read succeeds
    pub state_failures: usize,

    // Recorded traffic
    pub resets: usize,
    pub started: Vec<(String, f64)>,
    pub mutations: Vec<(Vec<FlowId>, Vec<usize>)>,
    pub score_queries: Vec<Vec<FlowId>>,
    pub state_reads: usize,
    pub gamma: Option<f64>,
    pub coefficients: Vec<(String, f64, f64)>,
    pub action_times: Vec<Instant>,
    pub score_times: Vec<Instant>,
}

impl ScriptedBackend {
    pub fn new(frames: Vec<StateSnapshot>) -> Self {
        Self {
            address: "10.9.8.7:5000".to_string(),
            frames: frames.into(),
            actions: ActionSpace {
                actions: vec!["allow".into(), "block".into(), "mirror".into()],
                categories: vec!["pass".into(), "drop".into(), "inspect".into()],
            },
            flow_scores: HashMap::new(),
            episode_counts: vec![[1.0, 1.0, 1.0, 1.0, 1.0]],
            score_failures: 0,
            garbled_scores: 0,
            state_failures: 0,
            resets: 0,
            started: Vec::new(),
            mutations: Vec::new(),
            score_queries: Vec::new(),
            state_reads: 0,
            gamma: None,
            coefficients: Vec::new(),
            action_times: Vec::new(),
            score_times: Vec::new(),
        }
    }

    /// Backend serving the same frame forever
    pub fn steady(flows: &[&str], frame_size: usize) -> Self {
        Self::new(vec![snapshot(
            flows,
            flows.iter().map(|_| vec![1.0; frame_size]).collect(),
        )])
    }
}

/// Snapshot helper
pub fn snapshot(flows: &[&str], features: Vec<Vec<f32>>) -> StateSnapshot {
    StateSnapshot {
        flows: flows.iter().map(|f| f.to_string()).collect(),
        flow_features: features,
        packet_features: Vec::new(),
        stats: FlowStats {
            normal_flow_counts: 3.0,
            attack_flow_counts: 1.0,
            infected_devices: vec!["10.0.0.5".into()],
        },
    }
}

impl TelemetryClient for ScriptedBackend {
    fn address(&self) -> &str {
        &self.address
    }

    fn read_state(&mut self) -> Result<StateSnapshot, TelemetryError> {
        if self.state_failures > 0 {
            self.state_failures -= 1;
            return Err(TelemetryError::NetworkError("connection refused".into()));
        }
        self.state_reads += 1;
        let frame = if self.frames.len() > 1 {
            self.frames.pop_front()
        } else {
            self.frames.front().cloned()
        };
        Ok(frame.unwrap_or_default())
    }

    fn read_actions(&mut self) -> Result<ActionSpace, TelemetryError> {
        Ok(self.actions.clone())
    }

    fn read_score(&mut self, flows: &[FlowId]) -> Result<ScoreReport, TelemetryError> {
        self.score_times.push(Instant::now());
        if self.score_failures > 0 {
            self.score_failures -= 1;
            return Err(TelemetryError::ServerError(503));
        }
        if self.garbled_scores > 0 {
            self.garbled_scores -= 1;
            return Err(TelemetryError::ParseError("unexpected end of JSON input".into()));
        }
        self.score_queries.push(flows.to_vec());

        let episode = self.resets.saturating_sub(1).min(self.episode_counts.len().saturating_sub(1));
        let counts = self.episode_counts.get(episode).copied().unwrap_or_default();
        let scores = flows
            .iter()
            .map(|f| self.flow_scores.get(f).copied().unwrap_or(0.0))
            .collect();

        Ok(ScoreReport { scores, counts })
    }

    fn set_gamma(&mut self, gamma: f64) -> Result<(), TelemetryError> {
        self.gamma = Some(gamma);
        Ok(())
    }

    fn set_coefficients(&mut self, attack: &str, a: f64, b: f64) -> Result<(), TelemetryError> {
        self.coefficients.push((attack.to_string(), a, b));
        Ok(())
    }

    fn reset(&mut self) -> Result<(), TelemetryError> {
        self.resets += 1;
        Ok(())
    }

    fn start_episode(&mut self, attack: &str, start: f64) -> Result<(), TelemetryError> {
        self.started.push((attack.to_string(), start));
        Ok(())
    }

    fn mutate_action(&mut self, flows: &[FlowId], actions: &[usize]) -> Result<(), TelemetryError> {
        self.action_times.push(Instant::now());
        self.mutations.push((flows.to_vec(), actions.to_vec()));
        Ok(())
    }
}
