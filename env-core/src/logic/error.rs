//! Environment errors
//!
//! Only configuration errors and exhausted retry budgets ever reach the
//! training loop; everything transient is absorbed by the retry layer.

use super::telemetry::TelemetryError;

pub type EnvResult<T> = Result<T, EnvError>;

#[derive(Debug)]
pub enum EnvError {
    /// Invalid environment configuration (fatal, never retried)
    Config(String),
    /// Requested attack scenario is not in the configured attack-vector set
    UnknownAttack {
        attack: String,
        available: Vec<String>,
    },
    /// Caller supplied a different number of actions than there are flows
    ActionMismatch { expected: usize, actual: usize },
    /// Feature matrix does not match the frame dimensionality
    Shape(String),
    /// Backend kept failing after the whole retry budget was spent
    BackendUnavailable { operation: String, attempts: usize },
    /// Calibration produced negative coefficients in every allowed round
    CalibrationDiverged { attack: String, rounds: usize },
    /// Non-transient transport failure
    Telemetry(TelemetryError),
    /// Coefficient cache could not be written
    Store(String),
}

impl std::fmt::Display for EnvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvError::Config(msg) => write!(f, "Configuration error: {}", msg),
            EnvError::UnknownAttack { attack, available } => write!(
                f,
                "Unknown attack scenario '{}' (configured: {})",
                attack,
                available.join(", ")
            ),
            EnvError::ActionMismatch { expected, actual } => write!(
                f,
                "Action count mismatch: {} flows, {} actions",
                expected, actual
            ),
            EnvError::Shape(msg) => write!(f, "Shape error: {}", msg),
            EnvError::BackendUnavailable { operation, attempts } => write!(
                f,
                "Backend unavailable: '{}' failed after {} attempts",
                operation, attempts
            ),
            EnvError::CalibrationDiverged { attack, rounds } => write!(
                f,
                "Calibration for '{}' produced negative coefficients in all {} rounds",
                attack, rounds
            ),
            EnvError::Telemetry(e) => write!(f, "Telemetry error: {}", e),
            EnvError::Store(msg) => write!(f, "Coefficient store error: {}", msg),
        }
    }
}

impl std::error::Error for EnvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EnvError::Telemetry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TelemetryError> for EnvError {
    fn from(err: TelemetryError) -> Self {
        EnvError::Telemetry(err)
    }
}

impl From<std::io::Error> for EnvError {
    fn from(err: std::io::Error) -> Self {
        EnvError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for EnvError {
    fn from(err: serde_json::Error) -> Self {
        EnvError::Store(err.to_string())
    }
}

impl EnvError {
    /// Errors caused by the caller's configuration rather than the backend
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            EnvError::Config(_) | EnvError::UnknownAttack { .. } | EnvError::ActionMismatch { .. }
        )
    }
}
