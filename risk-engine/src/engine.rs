//! Assessment orchestration.

use std::sync::Arc;

use chrono::Utc;
use risk_assessment::{
    AssessmentError, FeatureNormalizer, Observation, RiskAssessment, RiskClassifier, RiskLevel,
    ScoringPipeline, StalenessEvaluator, SubjectProfile,
};
use risk_escalation::{
    Alert, AlertRepository, ContactDirectory, DispatchStatsSnapshot, EscalationCoordinator,
    EscalationError, InMemoryAlertStore, LiveChannelRegistry, MessagingGateway, NotificationSummary,
    OutboxRecord,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::records::{
    AssessmentRepository, InMemoryAssessmentStore, InMemoryObservationStore, ObservationRepository,
};

/// What one `assess` call produced.
#[derive(Debug)]
pub struct AssessmentOutcome {
    pub assessment: RiskAssessment,
    /// The subject's open alert when the assessment is High
    pub alert: Option<Alert>,
    /// Whether this call created `alert`
    pub alert_created: bool,
    /// Background notification fan-out, present only for a newly created alert
    pub dispatch: Option<JoinHandle<NotificationSummary>>,
    /// Whether a stored assessment was returned instead of scoring again
    pub reused: bool,
    /// Set when the assessment was stored but alert creation failed
    pub escalation_error: Option<EscalationError>,
}

/// Scores observations, stores the results and escalates High risk.
pub struct RiskEngine {
    pipeline: ScoringPipeline,
    staleness: StalenessEvaluator,
    observations: Arc<dyn ObservationRepository>,
    assessments: Arc<dyn AssessmentRepository>,
    escalation: EscalationCoordinator,
    live: Arc<LiveChannelRegistry>,
}

impl RiskEngine {
    /// Start building an engine around a loaded classifier.
    pub fn builder(
        classifier: Arc<RiskClassifier>,
        gateway: Arc<dyn MessagingGateway>,
        contacts: Arc<dyn ContactDirectory>,
    ) -> RiskEngineBuilder {
        RiskEngineBuilder {
            config: EngineConfig::default(),
            classifier,
            gateway,
            contacts,
            observations: None,
            assessments: None,
            alerts: None,
            live: None,
        }
    }

    pub fn classifier(&self) -> &RiskClassifier {
        self.pipeline.classifier()
    }

    /// Assess a new observation for the subject in `profile`.
    ///
    /// Nothing is stored unless scoring succeeds. Optional features missing
    /// from the observation resolve to the most recent stored value of each
    /// field. For a High assessment the outcome carries the subject's open
    /// alert, or `escalation_error` if the alert could not be created.
    pub async fn assess(&self, profile: &SubjectProfile, observation: Observation) -> Result<AssessmentOutcome> {
        if let Some(reason) = self.pipeline.classifier().not_ready_reason() {
            return Err(AssessmentError::ModelNotReady(reason.to_string()).into());
        }
        if observation.subject_id != profile.subject_id {
            return Err(EngineError::SubjectMismatch {
                observation: observation.subject_id,
                profile: profile.subject_id.clone(),
            });
        }
        let subject_id = profile.subject_id.as_str();

        let timeline = self.observations.list(subject_id).await?;
        let history = Observation::carry_forward(&timeline);
        self.staleness.ensure_sufficient(&observation, history.as_ref())?;

        let newest = history
            .as_ref()
            .map_or(observation.recorded_at, |h| h.recorded_at.max(observation.recorded_at));
        let previous = self.assessments.latest(subject_id).await?;
        let decision = self
            .staleness
            .evaluate(&newest, previous.as_ref().map(|a| &a.assessed_at), Utc::now());

        if let Some(previous) = previous.filter(|_| !decision.must_recompute()) {
            info!(
                subject_id = %subject_id,
                observation_id = %observation.id,
                assessment_id = %previous.id,
                "Observation not newer than stored assessment, reusing it"
            );
            let alert = if previous.risk_level == RiskLevel::High {
                self.escalation.open_alert(subject_id).await?
            } else {
                None
            };
            return Ok(AssessmentOutcome {
                assessment: previous,
                alert,
                alert_created: false,
                dispatch: None,
                reused: true,
                escalation_error: None,
            });
        }
        debug!(subject_id = %subject_id, decision = ?decision, "Scoring observation");

        let assessment = self.pipeline.score(&observation, history.as_ref(), profile)?;

        self.observations.append(observation).await?;
        self.assessments.insert(assessment.clone()).await?;
        info!(
            subject_id = %subject_id,
            assessment_id = %assessment.id,
            risk_level = %assessment.risk_level,
            risk_score = assessment.risk_score,
            "Assessment stored"
        );

        // already stored; escalation failures are reported on the outcome
        let (alert, alert_created, dispatch, escalation_error) =
            match self.escalation.trigger(&assessment, profile).await {
                Ok(Some(e)) => (Some(e.alert), e.created, e.dispatch, None),
                Ok(None) => (None, false, None, None),
                Err(e) => {
                    error!(
                        subject_id = %subject_id,
                        assessment_id = %assessment.id,
                        error = %e,
                        "Escalation failed for stored assessment"
                    );
                    (None, false, None, Some(e))
                }
            };

        Ok(AssessmentOutcome {
            assessment,
            alert,
            alert_created,
            dispatch,
            reused: false,
            escalation_error,
        })
    }

    /// Most recent assessment for display.
    pub async fn latest_assessment(&self, subject_id: &str) -> Result<Option<RiskAssessment>> {
        self.assessments.latest(subject_id).await
    }

    /// Every assessment for the subject, newest first.
    pub async fn assessment_history(&self, subject_id: &str) -> Result<Vec<RiskAssessment>> {
        self.assessments.history(subject_id).await
    }

    pub async fn observations(&self, subject_id: &str) -> Result<Vec<Observation>> {
        self.observations.list(subject_id).await
    }

    pub async fn resolve_alert(&self, alert_id: &str, actor: &str) -> Result<Alert> {
        let alert = self.escalation.resolve_alert(alert_id, actor).await?;
        info!(alert_id = %alert_id, actor = %actor, "Alert resolved");
        Ok(alert)
    }

    pub async fn cancel_alert(&self, alert_id: &str, actor: &str) -> Result<Alert> {
        let alert = self.escalation.cancel_alert(alert_id, actor).await?;
        info!(alert_id = %alert_id, actor = %actor, "Alert cancelled");
        Ok(alert)
    }

    pub async fn alert(&self, alert_id: &str) -> Result<Option<Alert>> {
        Ok(self.escalation.alert(alert_id).await?)
    }

    /// Alerts for the subject, newest first.
    pub async fn alerts_for(&self, subject_id: &str) -> Result<Vec<Alert>> {
        Ok(self.escalation.alerts_for(subject_id).await?)
    }

    /// Registry clients connect to for live alert events.
    pub fn live_channels(&self) -> &Arc<LiveChannelRegistry> {
        &self.live
    }

    pub fn dispatch_stats(&self) -> DispatchStatsSnapshot {
        self.escalation.stats()
    }

    /// Final per-destination delivery records, newest first.
    pub async fn recent_deliveries(&self, limit: usize) -> Vec<OutboxRecord> {
        self.escalation.outbox().recent(limit).await
    }
}

/// Builder for [`RiskEngine`]. Repositories default to in-memory stores.
pub struct RiskEngineBuilder {
    config: EngineConfig,
    classifier: Arc<RiskClassifier>,
    gateway: Arc<dyn MessagingGateway>,
    contacts: Arc<dyn ContactDirectory>,
    observations: Option<Arc<dyn ObservationRepository>>,
    assessments: Option<Arc<dyn AssessmentRepository>>,
    alerts: Option<Arc<dyn AlertRepository>>,
    live: Option<Arc<LiveChannelRegistry>>,
}

impl RiskEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observations(mut self, repository: Arc<dyn ObservationRepository>) -> Self {
        self.observations = Some(repository);
        self
    }

    pub fn assessments(mut self, repository: Arc<dyn AssessmentRepository>) -> Self {
        self.assessments = Some(repository);
        self
    }

    pub fn alerts(mut self, repository: Arc<dyn AlertRepository>) -> Self {
        self.alerts = Some(repository);
        self
    }

    pub fn live_channels(mut self, registry: Arc<LiveChannelRegistry>) -> Self {
        self.live = Some(registry);
        self
    }

    pub fn build(self) -> RiskEngine {
        let live = self.live.unwrap_or_default();
        let alerts: Arc<dyn AlertRepository> = match self.alerts {
            Some(alerts) => alerts,
            None => Arc::new(InMemoryAlertStore::new()),
        };

        let escalation = EscalationCoordinator::new(
            self.config.escalation.clone(),
            alerts,
            self.contacts,
            self.gateway,
            live.clone(),
        );

        let observations: Arc<dyn ObservationRepository> = match self.observations {
            Some(observations) => observations,
            None => Arc::new(InMemoryObservationStore::new()),
        };
        let assessments: Arc<dyn AssessmentRepository> = match self.assessments {
            Some(assessments) => assessments,
            None => Arc::new(InMemoryAssessmentStore::new()),
        };

        RiskEngine {
            pipeline: ScoringPipeline::new(self.classifier)
                .with_normalizer(FeatureNormalizer::with_defaults(self.config.features)),
            staleness: StalenessEvaluator::new(self.config.staleness),
            observations,
            assessments,
            escalation,
            live,
        }
    }
}
