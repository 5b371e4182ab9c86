//! Preeclampsia scorer.

use super::{ConditionScorer, ScorerInput, Tally, Thresholds};
use crate::types::{Condition, ConditionAssessment, RiskLevel};

const THRESHOLDS: Thresholds = Thresholds { high: 70, medium: 40 };
const CONFIDENCE: f64 = 0.85;

/// Weighted blood-pressure and history rules for preeclampsia.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreeclampsiaScorer;

fn level_advice(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => {
            "Contact your obstetric provider today; report headache, vision changes or sudden swelling immediately"
        }
        RiskLevel::Medium => "Check blood pressure daily and report readings at or above 140/90",
        RiskLevel::Low => "Continue routine blood pressure checks at prenatal visits",
    }
}

impl ConditionScorer for PreeclampsiaScorer {
    fn condition(&self) -> Condition {
        Condition::Preeclampsia
    }

    fn confidence(&self) -> f64 {
        CONFIDENCE
    }

    fn score(&self, input: &ScorerInput<'_>) -> ConditionAssessment {
        let f = input.features;
        let mut tally = Tally::default();

        tally.hit_if(
            input.hypertensive(),
            40,
            "Elevated blood pressure (>=140/90)",
            "Repeat blood pressure within 4 hours and test urine for protein",
        );
        // additive on top of the 140/90 hit
        tally.hit_if(
            input.severely_hypertensive(),
            30,
            "Severe-range blood pressure (>=160/110)",
            "Seek same-day obstetric evaluation for severe-range blood pressure",
        );
        tally.hit_if(
            f.bmi >= 30.0,
            15,
            "Obesity (BMI >= 30)",
            "Ask your provider about low-dose aspirin prophylaxis",
        );
        tally.hit_if(
            f.age < 20.0 || f.age > 35.0,
            10,
            "Maternal age outside 20-35",
            "Schedule more frequent prenatal blood pressure checks",
        );
        tally.hit_if(
            f.previous_complications,
            20,
            "Previous pregnancy complications",
            "Review prior pregnancy complications with your care team",
        );
        tally.hit_if(
            f.diabetes_history(),
            15,
            "Diabetes history",
            "Keep blood sugar within the targets agreed with your provider",
        );

        tally.finish(self.condition(), THRESHOLDS, self.confidence(), level_advice)
    }
}
