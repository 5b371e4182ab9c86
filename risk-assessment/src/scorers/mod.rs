//! Condition-specific rule scorers.
//!
//! Each scorer accumulates weighted indicator hits, capped at 1.0, and maps
//! the total onto its own High/Medium thresholds:
//! - **Preeclampsia**: blood pressure, BMI, age, history
//! - **Preterm labor**: history, blood pressure, age, BMI, gestational week
//! - **Gestational diabetes**: blood sugar, diabetes history, BMI, age
//!
//! Weights are kept in hundredths so threshold comparisons are exact.

mod gestational_diabetes;
mod preeclampsia;
mod preterm;

pub use gestational_diabetes::GestationalDiabetesScorer;
pub use preeclampsia::PreeclampsiaScorer;
pub use preterm::PretermLaborScorer;

use crate::features::FeatureVector;
use crate::types::{Condition, ConditionAssessment, RiskLevel};

/// Everything a scorer may look at.
#[derive(Debug, Clone, Copy)]
pub struct ScorerInput<'a> {
    pub features: &'a FeatureVector,
    /// Current gestational week, if pregnancy tracking knows it
    pub gestational_week: Option<u32>,
}

impl<'a> ScorerInput<'a> {
    pub fn new(features: &'a FeatureVector) -> Self {
        Self {
            features,
            gestational_week: None,
        }
    }

    pub fn with_gestational_week(mut self, week: Option<u32>) -> Self {
        self.gestational_week = week;
        self
    }

    /// Systolic ≥ 140 or diastolic ≥ 90.
    pub fn hypertensive(&self) -> bool {
        self.features.systolic_bp >= 140.0 || self.features.diastolic_bp >= 90.0
    }

    /// Systolic ≥ 160 or diastolic ≥ 110.
    pub fn severely_hypertensive(&self) -> bool {
        self.features.systolic_bp >= 160.0 || self.features.diastolic_bp >= 110.0
    }
}

/// Common trait for condition scorers. Implementations must be pure.
pub trait ConditionScorer: Send + Sync {
    /// Condition this scorer evaluates.
    fn condition(&self) -> Condition;

    /// Fixed heuristic confidence reported with every result.
    fn confidence(&self) -> f64;

    /// Score the input.
    fn score(&self, input: &ScorerInput<'_>) -> ConditionAssessment;
}

/// The three standard scorers, in reporting order.
pub fn default_scorers() -> Vec<Box<dyn ConditionScorer>> {
    vec![
        Box::new(PreeclampsiaScorer),
        Box::new(PretermLaborScorer),
        Box::new(GestationalDiabetesScorer),
    ]
}

/// Level cut-offs in hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Thresholds {
    pub high: u32,
    pub medium: u32,
}

impl Thresholds {
    pub fn level(&self, points: u32) -> RiskLevel {
        if points >= self.high {
            RiskLevel::High
        } else if points >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Running total of indicator hits.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    points: u32,
    factors: Vec<String>,
    recommendations: Vec<String>,
}

impl Tally {
    const CAP: u32 = 100;

    /// Record an indicator that fired.
    pub fn hit(&mut self, weight: u32, factor: &str, advice: &str) {
        self.points += weight;
        self.factors.push(factor.to_string());
        self.recommendations.push(advice.to_string());
    }

    /// Conditionally record an indicator.
    pub fn hit_if(&mut self, fired: bool, weight: u32, factor: &str, advice: &str) {
        if fired {
            self.hit(weight, factor, advice);
        }
    }

    pub fn finish(
        self,
        condition: Condition,
        thresholds: Thresholds,
        confidence: f64,
        level_advice: fn(RiskLevel) -> &'static str,
    ) -> ConditionAssessment {
        let points = self.points.min(Self::CAP);
        let level = thresholds.level(points);

        let mut recommendations = Vec::with_capacity(self.recommendations.len() + 1);
        recommendations.push(level_advice(level).to_string());
        for advice in self.recommendations {
            if !recommendations.contains(&advice) {
                recommendations.push(advice);
            }
        }

        ConditionAssessment {
            condition,
            level,
            score: f64::from(points) / 100.0,
            factors: self.factors,
            recommendations,
            confidence,
        }
    }
}
