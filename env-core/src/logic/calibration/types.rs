use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reward normalization for one attack scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackCoefficients {
    /// alpha
    #[serde(with = "lenient_f64")]
    pub a: f64,
    /// beta
    #[serde(with = "lenient_f64")]
    pub b: f64,
}

impl AttackCoefficients {
    /// Only negative coefficients are rejected; inf and NaN are accepted
    pub fn is_usable(&self) -> bool {
        !(self.a < 0.0 || self.b < 0.0)
    }
}

/// Everything pushed to a backend before training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientSet {
    /// Mean DNS-resolution ratio (taken from the last calibrated attack)
    #[serde(with = "lenient_f64")]
    pub gamma: f64,
    pub coeff: BTreeMap<String, AttackCoefficients>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibrated_at: Option<DateTime<Utc>>,
}

impl CoefficientSet {
    pub fn new(gamma: f64) -> Self {
        Self {
            gamma,
            coeff: BTreeMap::new(),
            calibrated_at: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.coeff.is_empty()
    }

    pub fn get(&self, attack: &str) -> Option<&AttackCoefficients> {
        self.coeff.get(attack)
    }

    /// Configured attacks that have no coefficients here
    pub fn missing<'a>(&self, attacks: &'a [String]) -> Vec<&'a str> {
        attacks
            .iter()
            .filter(|a| !self.coeff.contains_key(a.as_str()))
            .map(|a| a.as_str())
            .collect()
    }
}

/// Per-episode mean of the five score counters
///
/// Layout: `[attack_raw_0, attack_raw_1, dns_replies, resolved_packets, other_normal]`.
pub type CountSample = [f64; crate::constants::SCORE_COUNT_WIDTH];

pub const ATTACK_RAW_0: usize = 0;
pub const ATTACK_RAW_1: usize = 1;
pub const DNS_REPLIES: usize = 2;
pub const RESOLVED_PACKETS: usize = 3;
pub const OTHER_NORMAL: usize = 4;

/// JSON has no inf/NaN; those are stored as `"inf"`, `"-inf"` and `"NaN"`
mod lenient_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_str(&value.to_string())
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => Ok(v),
            Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        }
    }
}
