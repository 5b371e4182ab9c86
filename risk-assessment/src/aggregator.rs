//! Risk aggregation.
//!
//! The overall score is the maximum of the classifier's High-class
//! probability and every condition score: a single alarming component
//! dominates. Overall thresholds (0.7 / 0.4) differ from the per-scorer ones.

use chrono::Utc;
use tracing::debug;

use crate::classifier::ClassifierPrediction;
use crate::features::FeatureVector;
use crate::types::{ConditionAssessment, RiskAssessment, RiskLevel, ScoreDriver};

/// Prepended to the recommendations of every High assessment.
pub const URGENT_CARE_ADVICE: &str =
    "High overall risk: contact your healthcare provider or emergency services now";

/// Overall score before it is stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverallScore {
    /// Score on the 0 - 100 scale, one decimal
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub driver: ScoreDriver,
}

/// Combines classifier and scorer outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAggregator;

impl RiskAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Take the maximum component; ties go to the earliest component.
    pub fn combine(
        &self,
        prediction: &ClassifierPrediction,
        conditions: &[ConditionAssessment],
    ) -> OverallScore {
        let mut overall = prediction.class_probability;
        let mut driver = ScoreDriver::Classifier;
        for c in conditions {
            if c.score > overall {
                overall = c.score;
                driver = ScoreDriver::Condition(c.condition);
            }
        }

        let risk_score = ((overall.clamp(0.0, 1.0) * 1000.0).round() / 10.0).clamp(0.0, 100.0);
        OverallScore {
            risk_score,
            // derived from the stored score so level and score never disagree
            risk_level: RiskLevel::from_score(risk_score),
            driver,
        }
    }

    /// Build the assessment record.
    pub fn aggregate(
        &self,
        subject_id: &str,
        observation_id: Option<String>,
        features: FeatureVector,
        prediction: ClassifierPrediction,
        conditions: Vec<ConditionAssessment>,
    ) -> RiskAssessment {
        let overall = self.combine(&prediction, &conditions);

        let mut factors = vec![format!(
            "classifier: {} ({:.0}% confidence)",
            prediction.level,
            prediction.confidence * 100.0
        )];
        let mut recommendations = Vec::new();
        if overall.risk_level == RiskLevel::High {
            recommendations.push(URGENT_CARE_ADVICE.to_string());
        }
        for c in &conditions {
            factors.extend(c.factors.iter().map(|f| format!("{}: {}", c.condition.as_str(), f)));
            for r in &c.recommendations {
                if !recommendations.contains(r) {
                    recommendations.push(r.clone());
                }
            }
        }

        debug!(
            subject_id = %subject_id,
            risk_score = overall.risk_score,
            risk_level = %overall.risk_level,
            driver = ?overall.driver,
            "Risk aggregated"
        );

        RiskAssessment {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            observation_id,
            risk_level: overall.risk_level,
            risk_score: overall.risk_score,
            factors,
            recommendations,
            conditions,
            prediction,
            features,
            driver: overall.driver,
            assessed_at: Utc::now(),
        }
    }
}
