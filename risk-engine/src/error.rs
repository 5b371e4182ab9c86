//! Engine error type.

use risk_assessment::AssessmentError;
use risk_escalation::EscalationError;

/// Errors returned by [`crate::RiskEngine`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Scoring failed: classifier not ready, missing vitals or out-of-range values
    #[error(transparent)]
    Assessment(#[from] AssessmentError),

    /// Alert lookup or state-machine failure
    #[error(transparent)]
    Escalation(#[from] EscalationError),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Observation is for subject {observation}, profile is for {profile}")]
    SubjectMismatch { observation: String, profile: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Whether the caller can fix the request by sending more or corrected data.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EngineError::Assessment(e) => e.is_recoverable(),
            EngineError::SubjectMismatch { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
