//! Preterm labor scorer.

use super::{ConditionScorer, ScorerInput, Tally, Thresholds};
use crate::types::{Condition, ConditionAssessment, RiskLevel};

const THRESHOLDS: Thresholds = Thresholds { high: 60, medium: 30 };
const CONFIDENCE: f64 = 0.80;

#[derive(Debug, Clone, Copy, Default)]
pub struct PretermLaborScorer;

fn level_advice(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => {
            "Arrange an obstetric review this week; seek care at once for contractions, pelvic pressure or fluid leakage"
        }
        RiskLevel::Medium => "Learn the early signs of preterm labor and discuss cervical length screening",
        RiskLevel::Low => "Keep attending scheduled prenatal visits",
    }
}

impl ConditionScorer for PretermLaborScorer {
    fn condition(&self) -> Condition {
        Condition::PretermLabor
    }

    fn confidence(&self) -> f64 {
        CONFIDENCE
    }

    fn score(&self, input: &ScorerInput<'_>) -> ConditionAssessment {
        let f = input.features;
        let mut tally = Tally::default();

        tally.hit_if(
            f.previous_complications,
            30,
            "Previous pregnancy complications",
            "Ask whether progesterone therapy is appropriate given your history",
        );
        tally.hit_if(
            input.hypertensive(),
            20,
            "Elevated blood pressure (>=140/90)",
            "Have blood pressure rechecked within a week",
        );
        tally.hit_if(
            f.age < 18.0 || f.age > 40.0,
            15,
            "Maternal age under 18 or over 40",
            "Schedule additional prenatal monitoring visits",
        );
        tally.hit_if(
            f.bmi < 18.5 || f.bmi >= 30.0,
            10,
            "BMI under 18.5 or 30 and above",
            "Ask for a nutrition consultation",
        );
        tally.hit_if(
            input.gestational_week.is_some_and(|week| week < 20),
            15,
            "Early gestation (under 20 weeks)",
            "Confirm dating and early-pregnancy follow-up with your provider",
        );
        tally.hit_if(
            f.gestational_diabetes,
            15,
            "Gestational diabetes",
            "Keep glucose monitoring on schedule",
        );
        tally.hit_if(
            f.mental_health,
            10,
            "Mental health concern",
            "Reach out to a perinatal mental health professional",
        );

        tally.finish(self.condition(), THRESHOLDS, self.confidence(), level_advice)
    }
}
