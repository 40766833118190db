//! Episode Controller
//!
//! Ordering inside one step is fixed: action, pacing wait, score read,
//! state read.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{Observation, ObservationSpace, StepInfo, StepOutcome};
use crate::logic::calibration::{self, CoefficientSet, CoefficientStore};
use crate::logic::config::EnvConfig;
use crate::logic::error::{EnvError, EnvResult};
use crate::logic::pacing::Pacer;
use crate::logic::stacking::{Frame, ScoreRecord, ScoreWindow, StackWindow};
use crate::logic::telemetry::{
    retry_transient, retry_when, ActionSpace, FlowId, StateSnapshot, TelemetryClient, TelemetryError,
};

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    /// Constructed, no episode started yet
    Ready,
    Running { attack: String, steps: u64 },
}

pub struct EpisodeController<C: TelemetryClient> {
    client: C,
    config: EnvConfig,
    pacer: Pacer,
    coefficients: CoefficientSet,
    observation_space: ObservationSpace,
    action_space: ActionSpace,
    flows: Vec<FlowId>,
    window: StackWindow,
    scores: ScoreWindow,
    phase: Phase,
    rng: StdRng,
}

impl<C: TelemetryClient> EpisodeController<C> {
    /// Connect, calibrate if needed and push coefficients to the backend
    pub fn new(mut client: C, config: EnvConfig, store: &dyn CoefficientStore) -> EnvResult<Self> {
        config.validate()?;

        let (frame_size, action_space) = retry_transient(&config.readiness_retry, "readiness", || {
            let state = client.read_state()?;
            let frame_size = state
                .frame_size()
                .ok_or_else(|| TelemetryError::NotReady("no active flows".to_string()))?;
            let actions = client.read_actions()?;
            Ok((frame_size, actions))
        })?;

        if action_space.is_empty() {
            return Err(EnvError::Config(format!(
                "backend {} reports no actions",
                client.address()
            )));
        }

        let coefficients = calibration::ensure_coefficients(&mut client, store, &config)?;

        retry_transient(&config.readiness_retry, "configure", || {
            client.set_gamma(coefficients.gamma)?;
            for (attack, coeff) in &coefficients.coeff {
                client.set_coefficients(attack, coeff.a, coeff.b)?;
            }
            Ok(())
        })?;

        log::info!("Environment {} has been initialized (frame size {}, {} actions, stack {})",
            client.address(), frame_size, action_space.len(), config.stack_size);

        Ok(Self {
            pacer: Pacer::new(config.delay),
            observation_space: ObservationSpace {
                stack_size: config.stack_size,
                frame_size,
            },
            window: StackWindow::new(config.stack_size, frame_size),
            scores: ScoreWindow::new(config.stack_size),
            client,
            config,
            coefficients,
            action_space,
            flows: Vec::new(),
            phase: Phase::Ready,
            rng: StdRng::from_entropy(),
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start a new episode with a uniformly chosen attack
    pub fn reset(&mut self) -> EnvResult<(Observation, Vec<FlowId>)> {
        let attack = self
            .config
            .attack_vectors
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| EnvError::Config("attack vector list is empty".to_string()))?;
        self.reset_with_attack(&attack)
    }

    /// Start a new episode with a specific attack
    pub fn reset_with_attack(&mut self, attack: &str) -> EnvResult<(Observation, Vec<FlowId>)> {
        if !self.config.has_attack(attack) {
            return Err(EnvError::UnknownAttack {
                attack: attack.to_string(),
                available: self.config.attack_vectors.clone(),
            });
        }

        self.client.reset()?;
        self.client.start_episode(attack, self.pacer.delay_secs())?;

        self.window.clear();
        self.scores.clear();

        let state = self.client.read_state()?;
        self.flows = state.flows.clone();
        let observation = self.observe(&state)?;

        log::info!("Episode started on {} with {} ({} flows)",
            self.client.address(), attack, self.flows.len());
        self.phase = Phase::Running { attack: attack.to_string(), steps: 0 };

        Ok((observation, self.flows.clone()))
    }

    /// Apply one action per current flow and observe the result
    pub fn step(&mut self, actions: &[usize]) -> EnvResult<StepOutcome> {
        if self.phase == Phase::Ready {
            return Err(EnvError::Config("step called before reset".to_string()));
        }
        if actions.len() != self.flows.len() {
            return Err(EnvError::ActionMismatch {
                expected: self.flows.len(),
                actual: actions.len(),
            });
        }

        let t0 = Instant::now();
        self.client.mutate_action(&self.flows, actions)?;
        self.pacer.wait_since(t0);

        let queried = self.flows.clone();
        let client = &mut self.client;
        let report = retry_when(&self.config.score_retry, "score", TelemetryError::is_retryable_read, || {
            client.read_score(&queried)
        })?;

        let state = self.client.read_state()?;
        self.flows = state.flows.clone();

        let record = ScoreRecord::new(queried, report.scores)?;
        let observation = self.observe(&state)?;
        let rewards = if self.config.stack_size > 1 {
            self.scores.push(record);
            self.scores.aggregate()
        } else {
            record.into_rewards()
        };

        if let Phase::Running { attack, steps } = &mut self.phase {
            *steps += 1;
            log::debug!("{} step {}: {} flows, mean reward {:.4}",
                attack, steps, self.flows.len(), rewards.mean());
        }

        Ok(StepOutcome {
            observation,
            rewards,
            done: false,
            info: StepInfo {
                flows: self.flows.clone(),
                stats: (&state.stats).into(),
            },
        })
    }

    fn observe(&mut self, state: &StateSnapshot) -> EnvResult<Observation> {
        let frame = Frame::from_snapshot(state, self.observation_space.frame_size)?;

        if self.config.stack_size > 1 {
            self.window.push(frame)?;
            Ok(Observation::Stacked(self.window.align(&self.flows)))
        } else {
            Ok(Observation::Flat(frame.features().clone()))
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Uniform random action for every current flow
    pub fn sample_actions(&mut self) -> Vec<usize> {
        let n = self.action_space.len();
        (0..self.flows.len()).map(|_| self.rng.gen_range(0..n)).collect()
    }

    /// Reseed attack selection and action sampling
    pub fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn observation_space(&self) -> ObservationSpace {
        self.observation_space
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    pub fn coefficients(&self) -> &CoefficientSet {
        &self.coefficients
    }

    /// Flows the next `step` must provide actions for
    pub fn flows(&self) -> &[FlowId] {
        &self.flows
    }

    pub fn current_attack(&self) -> Option<&str> {
        match &self.phase {
            Phase::Running { attack, .. } => Some(attack),
            Phase::Ready => None,
        }
    }

    pub fn steps_taken(&self) -> u64 {
        match &self.phase {
            Phase::Running { steps, .. } => *steps,
            Phase::Ready => 0,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }
}
