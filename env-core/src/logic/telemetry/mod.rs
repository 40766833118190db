//! Telemetry Module
//!
//! Boundary to the network-defense simulator backend.
//!
//! ## Structure
//! - `mod.rs` - `TelemetryClient` trait + wire types
//! - `http.rs` - Blocking HTTP/JSON implementation (ureq)
//! - `retry.rs` - Bounded exponential backoff for transient failures
//!
//! The environment core only ever talks to `TelemetryClient`, so tests can
//! swap in a scripted backend.

pub mod http;
pub mod retry;

#[cfg(test)]
pub(crate) mod stub;

pub use http::{HttpTelemetryClient, HttpConfig};
pub use retry::{retry_transient, retry_when, RetryPolicy};

use serde::{Deserialize, Serialize};

/// Opaque flow identity (traffic-pattern key)
pub type FlowId = String;

// ============================================================================
// WIRE TYPES
// ============================================================================

/// Aggregate counters reported with every state read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowStats {
    #[serde(default)]
    pub normal_flow_counts: f64,
    #[serde(default)]
    pub attack_flow_counts: f64,
    /// Device ids as reported (strings or numbers); only the count is used
    #[serde(default)]
    pub infected_devices: Vec<serde_json::Value>,
}

/// One backend state read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    /// Active flows, in backend order
    pub flows: Vec<FlowId>,
    /// One feature row per flow
    pub flow_features: Vec<Vec<f32>>,
    /// Per-packet feature rows (not used for stacking)
    pub packet_features: Vec<Vec<f32>>,
    pub stats: FlowStats,
}

impl StateSnapshot {
    /// Width of a flow feature row, if any flow is active
    pub fn frame_size(&self) -> Option<usize> {
        self.flow_features.first().map(|row| row.len())
    }
}

/// Available mitigation actions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionSpace {
    pub actions: Vec<String>,
    pub categories: Vec<String>,
}

impl ActionSpace {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Per-flow scores plus the raw calibration counters
///
/// Counter layout: `[attack_raw_0, attack_raw_1, dns_replies, resolved_packets, other_normal]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreReport {
    pub scores: Vec<f32>,
    pub counts: [f64; crate::constants::SCORE_COUNT_WIDTH],
}

// ============================================================================
// ERRORS
// ============================================================================

/// Transport-level failures
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryError {
    NetworkError(String),
    ServerError(u16),
    ParseError(String),
    /// Backend answered but has nothing usable yet (e.g. no active flows)
    NotReady(String),
}

impl TelemetryError {
    /// Connection failures and 5xx responses are worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NetworkError(_) => true,
            Self::ServerError(code) => *code >= 500,
            Self::ParseError(_) => false,
            Self::NotReady(_) => true,
        }
    }

    /// Reads are idempotent, so a garbled body is retried too
    pub fn is_retryable_read(&self) -> bool {
        self.is_transient() || matches!(self, Self::ParseError(_))
    }
}

impl std::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError(e) => write!(f, "Network error: {}", e),
            Self::ServerError(code) => write!(f, "Server error: {}", code),
            Self::ParseError(e) => write!(f, "Parse error: {}", e),
            Self::NotReady(e) => write!(f, "Backend not ready: {}", e),
        }
    }
}

impl std::error::Error for TelemetryError {}

// ============================================================================
// CLIENT TRAIT
// ============================================================================

/// Request/response operations exposed by the simulator
pub trait TelemetryClient {
    /// Backend address (host:port); the host part keys the coefficient cache
    fn address(&self) -> &str;

    fn read_state(&mut self) -> Result<StateSnapshot, TelemetryError>;

    fn read_actions(&mut self) -> Result<ActionSpace, TelemetryError>;

    fn read_score(&mut self, flows: &[FlowId]) -> Result<ScoreReport, TelemetryError>;

    fn set_gamma(&mut self, gamma: f64) -> Result<(), TelemetryError>;

    fn set_coefficients(&mut self, attack: &str, a: f64, b: f64) -> Result<(), TelemetryError>;

    fn reset(&mut self) -> Result<(), TelemetryError>;

    /// `start` is the pacing delay in seconds
    fn start_episode(&mut self, attack: &str, start: f64) -> Result<(), TelemetryError>;

    fn mutate_action(&mut self, flows: &[FlowId], actions: &[usize]) -> Result<(), TelemetryError>;
}

/// Host part of a `host:port` address
pub fn host_of(address: &str) -> &str {
    address.split(':').next().unwrap_or(address)
}
