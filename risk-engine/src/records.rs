//! Observation and assessment storage.
//!
//! The engine only appends: observations and assessments are immutable once
//! stored.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use risk_assessment::{Observation, RiskAssessment};
use tokio::sync::RwLock;

use crate::error::Result;

/// A subject's observation timeline.
#[async_trait]
pub trait ObservationRepository: Send + Sync {
    async fn append(&self, observation: Observation) -> Result<()>;

    /// Most recently recorded observation for the subject.
    async fn latest(&self, subject_id: &str) -> Result<Option<Observation>>;

    /// All observations, newest first.
    async fn list(&self, subject_id: &str) -> Result<Vec<Observation>>;
}

/// Stored assessments, "latest wins" for display.
#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    async fn insert(&self, assessment: RiskAssessment) -> Result<()>;

    async fn latest(&self, subject_id: &str) -> Result<Option<RiskAssessment>>;

    /// All assessments, newest first.
    async fn history(&self, subject_id: &str) -> Result<Vec<RiskAssessment>>;
}

#[derive(Default)]
pub struct InMemoryObservationStore {
    observations: Arc<RwLock<HashMap<String, Vec<Observation>>>>,
}

impl InMemoryObservationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObservationRepository for InMemoryObservationStore {
    async fn append(&self, observation: Observation) -> Result<()> {
        let mut observations = self.observations.write().await;
        let timeline = observations.entry(observation.subject_id.clone()).or_default();
        // keep sorted by recorded_at; ties keep insertion order
        let pos = timeline.partition_point(|o| o.recorded_at <= observation.recorded_at);
        timeline.insert(pos, observation);
        Ok(())
    }

    async fn latest(&self, subject_id: &str) -> Result<Option<Observation>> {
        let observations = self.observations.read().await;
        Ok(observations.get(subject_id).and_then(|t| t.last()).cloned())
    }

    async fn list(&self, subject_id: &str) -> Result<Vec<Observation>> {
        let observations = self.observations.read().await;
        Ok(observations
            .get(subject_id)
            .map(|t| t.iter().rev().cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryAssessmentStore {
    assessments: Arc<RwLock<HashMap<String, Vec<RiskAssessment>>>>,
}

impl InMemoryAssessmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored assessments across subjects.
    pub async fn len(&self) -> usize {
        self.assessments.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AssessmentRepository for InMemoryAssessmentStore {
    async fn insert(&self, assessment: RiskAssessment) -> Result<()> {
        let mut assessments = self.assessments.write().await;
        let timeline = assessments.entry(assessment.subject_id.clone()).or_default();
        let pos = timeline.partition_point(|a| a.assessed_at <= assessment.assessed_at);
        timeline.insert(pos, assessment);
        Ok(())
    }

    async fn latest(&self, subject_id: &str) -> Result<Option<RiskAssessment>> {
        let assessments = self.assessments.read().await;
        Ok(assessments.get(subject_id).and_then(|t| t.last()).cloned())
    }

    async fn history(&self, subject_id: &str) -> Result<Vec<RiskAssessment>> {
        let assessments = self.assessments.read().await;
        Ok(assessments
            .get(subject_id)
            .map(|t| t.iter().rev().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_latest_observation_by_recorded_at() {
        let store = InMemoryObservationStore::new();
        let now = Utc::now();

        let newer = Observation::new("s1").with_heart_rate(90.0).recorded_at(now);
        let older = Observation::new("s1")
            .with_heart_rate(70.0)
            .recorded_at(now - Duration::hours(2));

        store.append(newer.clone()).await.unwrap();
        store.append(older.clone()).await.unwrap();

        assert_eq!(store.latest("s1").await.unwrap(), Some(newer.clone()));
        assert_eq!(store.list("s1").await.unwrap(), vec![newer, older]);
        assert!(store.latest("s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_assessment_store() {
        let store = InMemoryAssessmentStore::new();
        assert!(store.is_empty().await);
        assert!(store.latest("s1").await.unwrap().is_none());
        assert!(store.history("s1").await.unwrap().is_empty());
    }
}
