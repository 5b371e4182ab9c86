//! Gestational diabetes scorer.

use super::{ConditionScorer, ScorerInput, Tally, Thresholds};
use crate::types::{Condition, ConditionAssessment, RiskLevel};

const THRESHOLDS: Thresholds = Thresholds { high: 60, medium: 30 };
const CONFIDENCE: f64 = 0.82;

#[derive(Debug, Clone, Copy, Default)]
pub struct GestationalDiabetesScorer;

fn level_advice(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => "Book an oral glucose tolerance test and a diabetes care referral without delay",
        RiskLevel::Medium => "Recheck fasting blood sugar and follow a low-glycemic diet",
        RiskLevel::Low => "Keep to the standard 24-28 week glucose screening",
    }
}

impl ConditionScorer for GestationalDiabetesScorer {
    fn condition(&self) -> Condition {
        Condition::GestationalDiabetes
    }

    fn confidence(&self) -> f64 {
        CONFIDENCE
    }

    fn score(&self, input: &ScorerInput<'_>) -> ConditionAssessment {
        let f = input.features;
        let mut tally = Tally::default();

        if f.blood_sugar >= 126.0 {
            tally.hit(
                40,
                "Blood sugar in diabetic range (>=126 mg/dL)",
                "Confirm with a repeat fasting glucose or HbA1c test",
            );
        } else if f.blood_sugar >= 100.0 {
            tally.hit(
                20,
                "Elevated blood sugar (>=100 mg/dL)",
                "Track fasting blood sugar for the next week",
            );
        }
        tally.hit_if(
            f.gestational_diabetes,
            40,
            "Prior gestational diabetes",
            "Start early glucose screening given prior gestational diabetes",
        );
        tally.hit_if(
            f.preexisting_diabetes,
            50,
            "Preexisting diabetes",
            "Coordinate insulin or medication plans with your diabetes team",
        );
        tally.hit_if(
            f.bmi >= 30.0,
            20,
            "Obesity (BMI >= 30)",
            "Aim for moderate daily activity as advised by your provider",
        );
        tally.hit_if(
            f.age >= 35.0,
            15,
            "Maternal age 35 or over",
            "Discuss earlier glucose screening with your provider",
        );

        tally.finish(self.condition(), THRESHOLDS, self.confidence(), level_advice)
    }
}
