//! Simulator HTTP Client
//!
//! Blocking JSON client for the simulator REST endpoints.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use super::{ActionSpace, FlowId, FlowStats, ScoreReport, StateSnapshot, TelemetryClient, TelemetryError};
use crate::constants::{self, SCORE_COUNT_WIDTH};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// host:port of the simulator
    pub address: String,
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: constants::get_backend_addr(),
            timeout_seconds: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// `TelemetryClient` over plain HTTP
pub struct HttpTelemetryClient {
    config: HttpConfig,
    agent: ureq::Agent,
}

impl HttpTelemetryClient {
    pub fn new(config: HttpConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build();

        Self { config, agent }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.config.address, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TelemetryError> {
        let response = self.agent.get(&self.url(path)).call();
        read_json(response)
    }

    fn get_with_body<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, TelemetryError> {
        let payload = serde_json::to_string(body)
            .map_err(|e| TelemetryError::ParseError(e.to_string()))?;
        let response = self.agent.get(&self.url(path))
            .set("Content-Type", "application/json")
            .send_string(&payload);
        read_json(response)
    }

    fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<ureq::Response, TelemetryError> {
        let payload = serde_json::to_string(body)
            .map_err(|e| TelemetryError::ParseError(e.to_string()))?;
        self.agent.post(&self.url(path))
            .set("Content-Type", "application/json")
            .send_string(&payload)
            .map_err(map_ureq_error)
    }
}

impl TelemetryClient for HttpTelemetryClient {
    fn address(&self) -> &str {
        &self.config.address
    }

    fn read_state(&mut self) -> Result<StateSnapshot, TelemetryError> {
        let (flows, flow_features, packet_features, stats): (Vec<FlowId>, Vec<Vec<f32>>, Vec<Vec<f32>>, FlowStats) =
            self.get("state")?;

        if flows.len() != flow_features.len() {
            return Err(TelemetryError::ParseError(format!(
                "state lists {} flows but {} feature rows",
                flows.len(),
                flow_features.len()
            )));
        }

        Ok(StateSnapshot { flows, flow_features, packet_features, stats })
    }

    fn read_actions(&mut self) -> Result<ActionSpace, TelemetryError> {
        let (actions, categories): (Vec<serde_json::Value>, Vec<serde_json::Value>) = self.get("actions")?;

        Ok(ActionSpace {
            actions: actions.iter().map(value_label).collect(),
            categories: categories.iter().map(value_label).collect(),
        })
    }

    fn read_score(&mut self, flows: &[FlowId]) -> Result<ScoreReport, TelemetryError> {
        let (scores, counts): (Vec<f32>, Vec<f64>) = self.get_with_body("score", &json!({ "flows": flows }))?;

        let counts: [f64; SCORE_COUNT_WIDTH] = counts.try_into().map_err(|raw: Vec<f64>| {
            TelemetryError::ParseError(format!(
                "score counts have {} entries, expected {}",
                raw.len(),
                SCORE_COUNT_WIDTH
            ))
        })?;

        Ok(ScoreReport { scores, counts })
    }

    fn set_gamma(&mut self, gamma: f64) -> Result<(), TelemetryError> {
        self.post("dns_gamma", &json!({ "gamma": gamma }))?;
        Ok(())
    }

    fn set_coefficients(&mut self, attack: &str, a: f64, b: f64) -> Result<(), TelemetryError> {
        self.post(&format!("score_coeff/{}", attack), &json!({ "a": a, "b": b }))?;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), TelemetryError> {
        let _: serde_json::Value = self.get("reset")?;
        Ok(())
    }

    fn start_episode(&mut self, attack: &str, start: f64) -> Result<(), TelemetryError> {
        self.post("start_episode", &json!({ "attack": attack, "start": start }))?;
        Ok(())
    }

    fn mutate_action(&mut self, flows: &[FlowId], actions: &[usize]) -> Result<(), TelemetryError> {
        self.post("action", &json!({ "patterns": flows, "action_inds": actions }))?;
        Ok(())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn read_json<T: DeserializeOwned>(response: Result<ureq::Response, ureq::Error>) -> Result<T, TelemetryError> {
    let body = response
        .map_err(map_ureq_error)?
        .into_string()
        .map_err(|e| TelemetryError::NetworkError(e.to_string()))?;

    serde_json::from_str(&body).map_err(|e| TelemetryError::ParseError(e.to_string()))
}

fn map_ureq_error(err: ureq::Error) -> TelemetryError {
    match err {
        ureq::Error::Status(code, _) => TelemetryError::ServerError(code),
        ureq::Error::Transport(t) => TelemetryError::NetworkError(t.to_string()),
    }
}

/// Action names may come back as strings or raw numbers
fn value_label(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
