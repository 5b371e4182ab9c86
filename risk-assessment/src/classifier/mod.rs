//! Trained classifier wrapper.
//!
//! The classifier is loaded once from three artifacts and shared read-only.
//! A failed load leaves the wrapper unready; it never produces a fallback
//! prediction.

pub mod artifacts;
pub mod model;

pub use artifacts::{ArtifactPaths, LoadedArtifacts};
pub use model::LogisticModel;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AssessmentError, Result};
use crate::features::FeatureVector;
use crate::types::RiskLevel;

/// Probability assigned to one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    pub level: RiskLevel,
    pub probability: f64,
}

/// Output of the trained classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierPrediction {
    /// Label of the most probable class
    pub level: RiskLevel,
    /// Probability mass on the High class; this is what the aggregator consumes
    pub class_probability: f64,
    /// Maximum class probability
    pub confidence: f64,
    /// Full distribution, in class-index order
    pub probabilities: Vec<ClassProbability>,
}

/// Wrapper around the loaded model and label map.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    state: std::result::Result<LoadedArtifacts, String>,
}

impl RiskClassifier {
    /// Load artifacts from disk. Never fails: a failed load yields an unready
    /// classifier that rejects every prediction.
    pub fn load(paths: &ArtifactPaths) -> Self {
        match artifacts::load(paths) {
            Ok(loaded) => {
                info!(dir = %paths.dir.display(), "Risk classifier ready");
                Self::from_artifacts(loaded)
            }
            Err(e) => {
                warn!(dir = %paths.dir.display(), error = %e, "Risk classifier not ready");
                Self::unready(e.to_string())
            }
        }
    }

    /// Wrap artifacts that were already loaded and validated.
    pub fn from_artifacts(artifacts: LoadedArtifacts) -> Self {
        Self { state: Ok(artifacts) }
    }

    /// An unready classifier carrying the reason.
    pub fn unready(reason: impl Into<String>) -> Self {
        Self {
            state: Err(reason.into()),
        }
    }

    /// Whether predictions can be served.
    pub fn is_ready(&self) -> bool {
        self.state.is_ok()
    }

    /// Why the classifier is not ready, if it is not.
    pub fn not_ready_reason(&self) -> Option<&str> {
        self.state.as_ref().err().map(String::as_str)
    }

    fn loaded(&self) -> Result<&LoadedArtifacts> {
        self.state
            .as_ref()
            .map_err(|reason| AssessmentError::ModelNotReady(reason.clone()))
    }

    /// Predict the risk class for a feature vector.
    pub fn predict(&self, features: &FeatureVector) -> Result<ClassifierPrediction> {
        let loaded = self.loaded()?;
        let raw = loaded.model.predict_proba(&features.to_array());

        let probabilities: Vec<ClassProbability> = raw
            .iter()
            .zip(&loaded.labels)
            .map(|(p, level)| ClassProbability {
                level: *level,
                probability: *p,
            })
            .collect();

        let best = probabilities
            .iter()
            .copied()
            .fold(None::<ClassProbability>, |best, c| match best {
                Some(b) if b.probability >= c.probability => Some(b),
                _ => Some(c),
            })
            .ok_or_else(|| AssessmentError::ModelNotReady("model has no classes".to_string()))?;

        let class_probability = probabilities
            .iter()
            .filter(|c| c.level == RiskLevel::High)
            .map(|c| c.probability)
            .sum::<f64>()
            .clamp(0.0, 1.0);

        Ok(ClassifierPrediction {
            level: best.level,
            class_probability,
            confidence: best.probability,
            probabilities,
        })
    }
}
