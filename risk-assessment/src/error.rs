//! Error taxonomy for the scoring pipeline.

/// Errors surfaced to the caller of an assessment.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssessmentError {
    /// The trained classifier could not be loaded. Fatal for every request
    /// until the process is restarted with valid artifacts.
    #[error("Classifier not ready: {0}")]
    ModelNotReady(String),

    /// Mandatory vitals are missing from both the new observation and history.
    #[error("Insufficient data: missing {}", .missing.join(", "))]
    InsufficientData { missing: Vec<&'static str> },

    /// A feature value is outside its physiological bound.
    #[error("Invalid {feature}: {value} outside [{min}, {max}]")]
    Validation {
        feature: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A model artifact exists but could not be used.
    #[error("Artifact error ({artifact}): {reason}")]
    Artifact {
        artifact: &'static str,
        reason: String,
    },
}

impl AssessmentError {
    /// Whether supplying more or corrected data could make the request succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AssessmentError::InsufficientData { .. } | AssessmentError::Validation { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AssessmentError>;
