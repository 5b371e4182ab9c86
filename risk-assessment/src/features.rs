//! Feature normalization.
//!
//! Merges a partial observation with the most recent stored observation and
//! documented defaults, then checks every value against its physiological
//! bound. The output order is fixed and must match the classifier manifest.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AssessmentError, Result};
use crate::types::{Observation, SubjectProfile};

/// Number of features in a vector.
pub const FEATURE_COUNT: usize = 11;

/// Canonical feature order.
pub const FEATURE_ORDER: [&str; FEATURE_COUNT] = [
    "age",
    "systolic_bp",
    "diastolic_bp",
    "blood_sugar",
    "body_temp",
    "bmi",
    "previous_complications",
    "preexisting_diabetes",
    "gestational_diabetes",
    "mental_health",
    "heart_rate",
];

/// Inclusive physiological bound for a continuous feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub feature: &'static str,
    pub min: f64,
    pub max: f64,
}

impl Bound {
    const fn new(feature: &'static str, min: f64, max: f64) -> Self {
        Self { feature, min, max }
    }

    /// Reject values outside the bound (and non-finite values).
    pub fn check(&self, value: f64) -> Result<f64> {
        if value.is_finite() && value >= self.min && value <= self.max {
            Ok(value)
        } else {
            Err(AssessmentError::Validation {
                feature: self.feature,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

pub const AGE_BOUND: Bound = Bound::new("age", 10.0, 60.0);
pub const SYSTOLIC_BOUND: Bound = Bound::new("systolic_bp", 60.0, 250.0);
pub const DIASTOLIC_BOUND: Bound = Bound::new("diastolic_bp", 30.0, 160.0);
pub const BLOOD_SUGAR_BOUND: Bound = Bound::new("blood_sugar", 20.0, 600.0);
pub const BODY_TEMP_BOUND: Bound = Bound::new("body_temp", 90.0, 110.0);
pub const BMI_BOUND: Bound = Bound::new("bmi", 10.0, 70.0);
pub const HEART_RATE_BOUND: Bound = Bound::new("heart_rate", 30.0, 220.0);

/// Values used when neither the new observation nor history supplies one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureDefaults {
    pub age: f64,
    pub blood_sugar: f64,
    pub body_temp: f64,
    pub bmi: f64,
}

impl Default for FeatureDefaults {
    fn default() -> Self {
        Self {
            age: 28.0,
            blood_sugar: 90.0,
            body_temp: 98.0,
            bmi: 25.0,
        }
    }
}

/// A fully resolved, validated feature set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub age: f64,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub blood_sugar: f64,
    pub body_temp: f64,
    pub bmi: f64,
    pub previous_complications: bool,
    pub preexisting_diabetes: bool,
    pub gestational_diabetes: bool,
    pub mental_health: bool,
    pub heart_rate: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_ORDER`], flags encoded as 0.0 / 1.0.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        [
            self.age,
            self.systolic_bp,
            self.diastolic_bp,
            self.blood_sugar,
            self.body_temp,
            self.bmi,
            flag(self.previous_complications),
            flag(self.preexisting_diabetes),
            flag(self.gestational_diabetes),
            flag(self.mental_health),
            self.heart_rate,
        ]
    }

    /// Either diabetes history flag.
    pub fn diabetes_history(&self) -> bool {
        self.preexisting_diabetes || self.gestational_diabetes
    }
}

/// Merges observations into feature vectors.
#[derive(Debug, Clone, Default)]
pub struct FeatureNormalizer {
    defaults: FeatureDefaults,
}

impl FeatureNormalizer {
    /// Create a normalizer with the documented defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom defaults.
    pub fn with_defaults(defaults: FeatureDefaults) -> Self {
        Self { defaults }
    }

    /// Resolve each feature as new value, else last stored value, else default.
    pub fn normalize(
        &self,
        new: &Observation,
        last: Option<&Observation>,
        profile: &SubjectProfile,
    ) -> Result<FeatureVector> {
        let pick = |f: fn(&Observation) -> Option<f64>| f(new).or_else(|| last.and_then(f));
        let pick_flag =
            |f: fn(&Observation) -> Option<bool>| f(new).or_else(|| last.and_then(f)).unwrap_or(false);

        let systolic = pick(|o| o.systolic_bp);
        let diastolic = pick(|o| o.diastolic_bp);
        let heart_rate = pick(|o| o.heart_rate);

        let missing: Vec<&'static str> = [
            ("systolic_bp", systolic),
            ("diastolic_bp", diastolic),
            ("heart_rate", heart_rate),
        ]
        .iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| *name)
        .collect();
        let (Some(systolic), Some(diastolic), Some(heart_rate)) = (systolic, diastolic, heart_rate)
        else {
            return Err(AssessmentError::InsufficientData { missing });
        };

        let age = profile.age.map(f64::from).unwrap_or(self.defaults.age);

        let vector = FeatureVector {
            age: AGE_BOUND.check(age)?,
            systolic_bp: SYSTOLIC_BOUND.check(systolic)?,
            diastolic_bp: DIASTOLIC_BOUND.check(diastolic)?,
            blood_sugar: BLOOD_SUGAR_BOUND
                .check(pick(|o| o.blood_sugar).unwrap_or(self.defaults.blood_sugar))?,
            body_temp: BODY_TEMP_BOUND
                .check(pick(|o| o.body_temp).unwrap_or(self.defaults.body_temp))?,
            bmi: BMI_BOUND.check(pick(|o| o.bmi).unwrap_or(self.defaults.bmi))?,
            previous_complications: pick_flag(|o| o.previous_complications),
            preexisting_diabetes: pick_flag(|o| o.preexisting_diabetes),
            gestational_diabetes: pick_flag(|o| o.gestational_diabetes),
            mental_health: pick_flag(|o| o.mental_health),
            heart_rate: HEART_RATE_BOUND.check(heart_rate)?,
        };

        debug!(
            subject_id = %new.subject_id,
            observation_id = %new.id,
            used_history = last.is_some(),
            "Features normalized"
        );

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals(subject: &str) -> Observation {
        Observation::new(subject).with_bp(118.0, 76.0).with_heart_rate(75.0)
    }

    #[test]
    fn test_defaults_fill_gaps() {
        let normalizer = FeatureNormalizer::new();
        let profile = SubjectProfile::new("s1");

        let v = normalizer.normalize(&vitals("s1"), None, &profile).unwrap();

        assert_eq!(v.age, 28.0);
        assert_eq!(v.blood_sugar, 90.0);
        assert_eq!(v.bmi, 25.0);
        assert!(!v.previous_complications);
    }

    #[test]
    fn test_new_value_wins_over_history() {
        let normalizer = FeatureNormalizer::new();
        let profile = SubjectProfile::new("s1").with_age(33);
        let mut last = vitals("s1").with_bmi(31.0).with_blood_sugar(110.0);
        last.previous_complications = Some(true);
        let new = vitals("s1").with_blood_sugar(95.0);

        let v = normalizer.normalize(&new, Some(&last), &profile).unwrap();

        assert_eq!(v.age, 33.0);
        assert_eq!(v.blood_sugar, 95.0);
        assert_eq!(v.bmi, 31.0);
        assert!(v.previous_complications);
    }

    #[test]
    fn test_mandatory_vitals_from_history() {
        let normalizer = FeatureNormalizer::new();
        let profile = SubjectProfile::new("s1");
        let new = Observation::new("s1").with_blood_sugar(100.0);

        let v = normalizer
            .normalize(&new, Some(&vitals("s1")), &profile)
            .unwrap();
        assert_eq!(v.systolic_bp, 118.0);
        assert_eq!(v.heart_rate, 75.0);
    }

    #[test]
    fn test_missing_mandatory_vitals() {
        let normalizer = FeatureNormalizer::new();
        let new = Observation::new("s1").with_blood_sugar(100.0);

        let err = normalizer
            .normalize(&new, None, &SubjectProfile::new("s1"))
            .unwrap_err();
        assert_eq!(
            err,
            AssessmentError::InsufficientData {
                missing: vec!["systolic_bp", "diastolic_bp", "heart_rate"]
            }
        );
    }

    #[test]
    fn test_out_of_bound_rejected() {
        let normalizer = FeatureNormalizer::new();
        let new = vitals("s1").with_bmi(95.0);

        let err = normalizer
            .normalize(&new, None, &SubjectProfile::new("s1"))
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Validation { feature: "bmi", .. }));

        let err = normalizer
            .normalize(&vitals("s1"), None, &SubjectProfile::new("s1").with_age(70))
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Validation { feature: "age", .. }));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(HEART_RATE_BOUND.check(f64::NAN).is_err());
    }

    #[test]
    fn test_vector_order() {
        let normalizer = FeatureNormalizer::new();
        let mut new = vitals("s1");
        new.mental_health = Some(true);
        let v = normalizer
            .normalize(&new, None, &SubjectProfile::new("s1"))
            .unwrap();

        let arr = v.to_array();
        assert_eq!(arr[0], 28.0);
        assert_eq!(arr[1], 118.0);
        assert_eq!(arr[2], 76.0);
        assert_eq!(arr[9], 1.0);
        assert_eq!(arr[10], 75.0);
    }
}
