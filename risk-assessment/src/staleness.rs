//! Staleness evaluation.
//!
//! Decides whether a stored assessment may be returned or the full pipeline
//! must run, and rejects requests that lack the mandatory vitals.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AssessmentError, Result};
use crate::types::Observation;

/// Caching policy for assessments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StalenessPolicy {
    /// Every request is scored with the current logic.
    #[default]
    AlwaysRecompute,
    /// Reuse an assessment younger than `max_age_secs` that is not older
    /// than the newest observation.
    Ttl { max_age_secs: u64 },
}

/// Why the pipeline must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecomputeReason {
    NoPriorAssessment,
    PolicyAlwaysRecompute,
    NewerObservation,
    Expired,
}

/// Outcome of the staleness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessDecision {
    Recompute(RecomputeReason),
    Reuse,
}

impl StalenessDecision {
    pub fn must_recompute(&self) -> bool {
        matches!(self, StalenessDecision::Recompute(_))
    }
}

/// Convert any timezone-aware timestamp to the canonical zone.
pub fn to_canonical<Tz: TimeZone>(at: &DateTime<Tz>) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

/// Names of mandatory vitals that neither the new nor the stored observation has.
pub fn missing_mandatory(new: &Observation, history: Option<&Observation>) -> Vec<&'static str> {
    let has = |f: fn(&Observation) -> Option<f64>| f(new).is_some() || history.and_then(f).is_some();

    let mut missing = Vec::new();
    if !has(|o| o.systolic_bp) {
        missing.push("systolic_bp");
    }
    if !has(|o| o.diastolic_bp) {
        missing.push("diastolic_bp");
    }
    if !has(|o| o.heart_rate) {
        missing.push("heart_rate");
    }
    missing
}

/// `None` when the age does not fit a `Duration`; such assessments never expire.
fn max_age(secs: u64) -> Option<Duration> {
    i64::try_from(secs).ok().and_then(Duration::try_seconds)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StalenessEvaluator {
    policy: StalenessPolicy,
}

impl StalenessEvaluator {
    pub fn new(policy: StalenessPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    /// Fail with `InsufficientData` unless every mandatory vital is available.
    pub fn ensure_sufficient(&self, new: &Observation, history: Option<&Observation>) -> Result<()> {
        let missing = missing_mandatory(new, history);
        if missing.is_empty() {
            Ok(())
        } else {
            debug!(subject_id = %new.subject_id, missing = ?missing, "Mandatory vitals missing");
            Err(AssessmentError::InsufficientData { missing })
        }
    }

    /// Decide whether to recompute. Both timestamps are normalized to UTC first.
    pub fn evaluate<A: TimeZone, B: TimeZone>(
        &self,
        newest_observation: &DateTime<A>,
        last_assessment: Option<&DateTime<B>>,
        now: DateTime<Utc>,
    ) -> StalenessDecision {
        let Some(last_assessment) = last_assessment.map(to_canonical) else {
            return StalenessDecision::Recompute(RecomputeReason::NoPriorAssessment);
        };
        let newest_observation = to_canonical(newest_observation);

        match self.policy {
            StalenessPolicy::AlwaysRecompute => {
                StalenessDecision::Recompute(RecomputeReason::PolicyAlwaysRecompute)
            }
            StalenessPolicy::Ttl { max_age_secs } => {
                if newest_observation > last_assessment {
                    StalenessDecision::Recompute(RecomputeReason::NewerObservation)
                } else if max_age(max_age_secs).is_some_and(|limit| now - last_assessment >= limit) {
                    StalenessDecision::Recompute(RecomputeReason::Expired)
                } else {
                    StalenessDecision::Reuse
                }
            }
        }
    }
}
