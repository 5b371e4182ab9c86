//! Core types for risk scoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierPrediction;
use crate::features::FeatureVector;

/// Coarse risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl RiskLevel {
    /// Score (0-100) at or above which the overall level is High.
    pub const HIGH_SCORE: f64 = 70.0;
    /// Score (0-100) at or above which the overall level is Medium.
    pub const MEDIUM_SCORE: f64 = 40.0;

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Overall level for a 0-100 risk score, using the aggregator thresholds.
    pub fn from_score(score: f64) -> Self {
        if score >= Self::HIGH_SCORE {
            RiskLevel::High
        } else if score >= Self::MEDIUM_SCORE {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Parse a classifier label such as `"high risk"`, `"mid risk"` or `"Low"`.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        let head = normalized
            .strip_suffix("risk")
            .unwrap_or(&normalized)
            .trim_end_matches(|c: char| c == ' ' || c == '_' || c == '-');
        match head {
            "low" => Some(RiskLevel::Low),
            "mid" | "medium" | "moderate" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timestamped vitals/history snapshot.
///
/// Every field is optional: collaborators may record partial snapshots and
/// the normalizer fills gaps from history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Unique observation ID
    #[serde(default = "new_id")]
    pub id: String,
    /// Subject-timeline this observation belongs to
    pub subject_id: String,
    /// Systolic blood pressure (mmHg)
    pub systolic_bp: Option<f64>,
    /// Diastolic blood pressure (mmHg)
    pub diastolic_bp: Option<f64>,
    /// Fasting blood sugar (mg/dL)
    pub blood_sugar: Option<f64>,
    /// Body temperature (°F)
    pub body_temp: Option<f64>,
    /// Heart rate (bpm)
    pub heart_rate: Option<f64>,
    /// Weight (kg), informational only
    pub weight: Option<f64>,
    /// Body-mass index
    pub bmi: Option<f64>,
    pub previous_complications: Option<bool>,
    pub preexisting_diabetes: Option<bool>,
    pub gestational_diabetes: Option<bool>,
    pub mental_health: Option<bool>,
    /// When the snapshot was taken
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Observation {
    /// Create an empty observation for a subject, stamped now.
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            subject_id: subject_id.into(),
            recorded_at: Utc::now(),
            ..Default::default()
        }
    }

    /// Set blood pressure.
    pub fn with_bp(mut self, systolic: f64, diastolic: f64) -> Self {
        self.systolic_bp = Some(systolic);
        self.diastolic_bp = Some(diastolic);
        self
    }

    /// Set heart rate.
    pub fn with_heart_rate(mut self, bpm: f64) -> Self {
        self.heart_rate = Some(bpm);
        self
    }

    /// Set blood sugar.
    pub fn with_blood_sugar(mut self, mg_dl: f64) -> Self {
        self.blood_sugar = Some(mg_dl);
        self
    }

    /// Set BMI.
    pub fn with_bmi(mut self, bmi: f64) -> Self {
        self.bmi = Some(bmi);
        self
    }

    /// Set body temperature.
    pub fn with_body_temp(mut self, fahrenheit: f64) -> Self {
        self.body_temp = Some(fahrenheit);
        self
    }

    /// Set the recording time.
    pub fn recorded_at(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_at = at;
        self
    }

    /// Fill every field this snapshot left empty from an older one.
    pub fn fill_missing_from(&mut self, older: &Observation) {
        fn fill<T: Copy>(slot: &mut Option<T>, older: Option<T>) {
            if slot.is_none() {
                *slot = older;
            }
        }
        fill(&mut self.systolic_bp, older.systolic_bp);
        fill(&mut self.diastolic_bp, older.diastolic_bp);
        fill(&mut self.blood_sugar, older.blood_sugar);
        fill(&mut self.body_temp, older.body_temp);
        fill(&mut self.heart_rate, older.heart_rate);
        fill(&mut self.weight, older.weight);
        fill(&mut self.bmi, older.bmi);
        fill(&mut self.previous_complications, older.previous_complications);
        fill(&mut self.preexisting_diabetes, older.preexisting_diabetes);
        fill(&mut self.gestational_diabetes, older.gestational_diabetes);
        fill(&mut self.mental_health, older.mental_health);
    }

    /// Collapse a newest-first timeline into one snapshot holding the most
    /// recent known value of every field.
    ///
    /// The result keeps the id and timestamp of the newest observation.
    pub fn carry_forward<'a>(timeline: impl IntoIterator<Item = &'a Observation>) -> Option<Observation> {
        let mut timeline = timeline.into_iter();
        let mut merged = timeline.next()?.clone();
        for older in timeline {
            merged.fill_missing_from(older);
        }
        Some(merged)
    }
}

/// What identity and pregnancy tracking know about the subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectProfile {
    pub subject_id: String,
    /// Age in years
    pub age: Option<u32>,
    /// The subject's own messaging channel
    pub phone: Option<String>,
    /// Current gestational week
    pub gestational_week: Option<u32>,
}

impl SubjectProfile {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            ..Default::default()
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_gestational_week(mut self, week: u32) -> Self {
        self.gestational_week = Some(week);
        self
    }
}

/// Pregnancy complication evaluated by a rule scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Preeclampsia,
    PretermLabor,
    GestationalDiabetes,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Preeclampsia => "preeclampsia",
            Condition::PretermLabor => "preterm_labor",
            Condition::GestationalDiabetes => "gestational_diabetes",
        }
    }
}

/// Result of one condition scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionAssessment {
    pub condition: Condition,
    pub level: RiskLevel,
    /// Accumulated weight (0.0 - 1.0)
    pub score: f64,
    /// Labels of the indicators that fired
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
    /// Fixed heuristic confidence of the scorer
    pub confidence: f64,
}

/// Component whose score became the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreDriver {
    Classifier,
    Condition(Condition),
}

/// One scoring result. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub id: String,
    pub subject_id: String,
    /// Source observation, if the assessment was computed from a stored one
    pub observation_id: Option<String>,
    pub risk_level: RiskLevel,
    /// Overall score (0 - 100)
    pub risk_score: f64,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
    /// Per-condition breakdown
    pub conditions: Vec<ConditionAssessment>,
    pub prediction: ClassifierPrediction,
    /// Feature vector the assessment was computed from
    pub features: FeatureVector,
    pub driver: ScoreDriver,
    pub assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// Breakdown entry for one condition.
    pub fn condition(&self, condition: Condition) -> Option<&ConditionAssessment> {
        self.conditions.iter().find(|c| c.condition == condition)
    }
}
