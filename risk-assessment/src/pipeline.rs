//! Synchronous scoring pipeline: normalizer → {classifier, scorers} → aggregator.

use std::sync::Arc;

use crate::aggregator::RiskAggregator;
use crate::classifier::RiskClassifier;
use crate::error::{AssessmentError, Result};
use crate::features::FeatureNormalizer;
use crate::scorers::{default_scorers, ConditionScorer, ScorerInput};
use crate::types::{Observation, RiskAssessment, SubjectProfile};

/// Stateless scorer shared across requests.
pub struct ScoringPipeline {
    normalizer: FeatureNormalizer,
    classifier: Arc<RiskClassifier>,
    scorers: Vec<Box<dyn ConditionScorer>>,
    aggregator: RiskAggregator,
}

impl ScoringPipeline {
    /// Pipeline with the standard normalizer and the three condition scorers.
    pub fn new(classifier: Arc<RiskClassifier>) -> Self {
        Self {
            normalizer: FeatureNormalizer::new(),
            classifier,
            scorers: default_scorers(),
            aggregator: RiskAggregator::new(),
        }
    }

    /// Replace the normalizer, e.g. one with configured defaults.
    pub fn with_normalizer(mut self, normalizer: FeatureNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    pub fn is_ready(&self) -> bool {
        self.classifier.is_ready()
    }

    /// Score one observation against the subject's most recent stored one.
    pub fn score(
        &self,
        observation: &Observation,
        history: Option<&Observation>,
        profile: &SubjectProfile,
    ) -> Result<RiskAssessment> {
        if let Some(reason) = self.classifier.not_ready_reason() {
            return Err(AssessmentError::ModelNotReady(reason.to_string()));
        }

        let features = self.normalizer.normalize(observation, history, profile)?;
        let prediction = self.classifier.predict(&features)?;

        let input = ScorerInput::new(&features).with_gestational_week(profile.gestational_week);
        let conditions = self.scorers.iter().map(|s| s.score(&input)).collect();

        Ok(self.aggregator.aggregate(
            &profile.subject_id,
            Some(observation.id.clone()),
            features,
            prediction,
            conditions,
        ))
    }
}
