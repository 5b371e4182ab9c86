//! End-to-end assessment scenarios against the fixture model.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use risk_assessment::{
    ArtifactPaths, AssessmentError, Condition, Observation, RiskClassifier, RiskLevel, ScoreDriver,
    StalenessPolicy, SubjectProfile,
};
use risk_engine::{EngineConfig, EngineError, InMemoryAssessmentStore, RiskEngine};
use risk_escalation::{
    Alert, AlertRepository, AlertStatus, Contact, EscalationConfig, EscalationError,
    InMemoryAlertStore, InMemoryContactDirectory, MockMessagingGateway, NotificationSummary,
    RISK_ALERT_EVENT,
};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn classifier() -> Arc<RiskClassifier> {
    let classifier = RiskClassifier::load(&ArtifactPaths::in_dir(fixtures()));
    assert!(classifier.is_ready(), "{:?}", classifier.not_ready_reason());
    Arc::new(classifier)
}

fn config() -> EngineConfig {
    EngineConfig {
        escalation: EscalationConfig {
            max_attempts: 1,
            ..Default::default()
        },
        ..Default::default()
    }
}

struct Setup {
    engine: RiskEngine,
    gateway: Arc<MockMessagingGateway>,
    assessments: Arc<InMemoryAssessmentStore>,
    alerts: Arc<InMemoryAlertStore>,
}

fn setup_with(config: EngineConfig, contacts: Vec<Contact>) -> Setup {
    let gateway = Arc::new(MockMessagingGateway::new());
    let assessments = Arc::new(InMemoryAssessmentStore::new());
    let alerts = Arc::new(InMemoryAlertStore::new());
    let engine = RiskEngine::builder(
        classifier(),
        gateway.clone(),
        Arc::new(InMemoryContactDirectory::new().with_contacts(contacts)),
    )
    .config(config)
    .assessments(assessments.clone())
    .alerts(alerts.clone())
    .build();

    Setup {
        engine,
        gateway,
        assessments,
        alerts,
    }
}

fn setup(contacts: Vec<Contact>) -> Setup {
    setup_with(config(), contacts)
}

fn profile() -> SubjectProfile {
    SubjectProfile::new("mother-1")
        .with_age(29)
        .with_phone("+254700000001")
        .with_gestational_week(28)
}

fn contacts() -> Vec<Contact> {
    vec![
        Contact::new("mother-1", "Wanjiru", "+254700000010").primary(),
        Contact::new("mother-1", "Otieno", "+254700000011"),
    ]
}

fn normal_observation() -> Observation {
    Observation::new("mother-1")
        .with_bp(118.0, 76.0)
        .with_blood_sugar(90.0)
        .with_bmi(24.0)
        .with_heart_rate(75.0)
}

fn high_observation() -> Observation {
    Observation {
        previous_complications: Some(true),
        ..Observation::new("mother-1")
            .with_bp(150.0, 95.0)
            .with_blood_sugar(140.0)
            .with_bmi(31.0)
            .with_heart_rate(88.0)
    }
}

#[tokio::test]
async fn normal_vitals_are_low_risk_without_alert() {
    let s = setup(contacts());

    let outcome = s.engine.assess(&profile(), normal_observation()).await.unwrap();

    assert_eq!(outcome.assessment.risk_level, RiskLevel::Low);
    assert!(outcome.assessment.risk_score < 40.0);
    assert!(outcome.alert.is_none());
    assert!(outcome.dispatch.is_none());
    assert!(!outcome.reused);
    assert!(s.alerts.is_empty().await);
    assert_eq!(s.gateway.call_count(), 0);
}

#[tokio::test]
async fn hypertension_with_history_escalates() {
    let s = setup(contacts());
    let mut live = s.engine.live_channels().connect("mother-1");

    let outcome = s.engine.assess(&profile(), high_observation()).await.unwrap();

    assert_eq!(outcome.assessment.risk_level, RiskLevel::High);
    assert!(outcome.assessment.risk_score >= 70.0);
    let preeclampsia = outcome.assessment.condition(Condition::Preeclampsia).unwrap();
    assert!(preeclampsia.score >= 0.7);
    assert_eq!(preeclampsia.level, RiskLevel::High);

    let alert = outcome.alert.unwrap();
    assert!(outcome.alert_created);
    assert_eq!(alert.status, AlertStatus::Active);
    assert!(!alert.contacts_notified);

    let summary = outcome.dispatch.unwrap().await.unwrap();
    assert_eq!(summary.delivered, 1);
    assert!(summary.subject_notified);

    let stored = s.engine.alert(&alert.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AlertStatus::ContactsNotified);
    assert!(stored.contacts_notified);
    assert_eq!(stored.assessment_id, outcome.assessment.id);

    let event = live.recv().await.unwrap();
    assert_eq!(event.kind, RISK_ALERT_EVENT);

    let destinations = s.gateway.destinations().await;
    assert!(destinations.contains(&"+254700000010".to_string()));
    assert!(destinations.contains(&"+254700000001".to_string()));
    assert!(!destinations.contains(&"+254700000011".to_string()));

    let deliveries = s.engine.recent_deliveries(10).await;
    assert_eq!(deliveries.len(), 2);
    assert!(deliveries.iter().all(|d| d.delivered() && d.alert_id == alert.id));
}

#[tokio::test]
async fn high_risk_without_contacts_still_notifies_subject() {
    let s = setup(Vec::new());

    let outcome = s.engine.assess(&profile(), high_observation()).await.unwrap();
    let alert = outcome.alert.unwrap();

    let summary = outcome.dispatch.unwrap().await.unwrap();
    assert_eq!(summary.delivered, 0);
    assert!(summary.subject_notified);

    let stored = s.engine.alert(&alert.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AlertStatus::Active);
    assert!(!stored.contacts_notified);
    assert_eq!(s.gateway.destinations().await, vec!["+254700000001".to_string()]);
}

#[tokio::test]
async fn missing_mandatory_vitals_persist_nothing() {
    let s = setup(contacts());
    let observation = Observation::new("mother-1").with_blood_sugar(150.0).with_bmi(33.0);

    let err = s.engine.assess(&profile(), observation).await.unwrap_err();

    assert!(err.is_recoverable());
    match &err {
        EngineError::Assessment(AssessmentError::InsufficientData { missing }) => {
            assert_eq!(missing, &vec!["systolic_bp", "diastolic_bp", "heart_rate"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(s.assessments.is_empty().await);
    assert!(s.alerts.is_empty().await);
    assert!(s.engine.observations("mother-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn history_fills_missing_vitals() {
    let s = setup(contacts());
    s.engine.assess(&profile(), normal_observation()).await.unwrap();

    let partial = Observation::new("mother-1").with_blood_sugar(100.0);
    let outcome = s.engine.assess(&profile(), partial).await.unwrap();

    assert_eq!(outcome.assessment.features.systolic_bp, 118.0);
    assert_eq!(outcome.assessment.features.heart_rate, 75.0);
    assert_eq!(s.engine.assessment_history("mother-1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn consecutive_partial_observations_carry_values_forward() {
    let s = setup(contacts());
    let now = Utc::now();
    let full = normal_observation()
        .with_bmi(33.0)
        .recorded_at(now - Duration::hours(2));
    s.engine.assess(&profile(), full).await.unwrap();

    let sugar = Observation::new("mother-1")
        .with_blood_sugar(110.0)
        .recorded_at(now - Duration::hours(1));
    s.engine.assess(&profile(), sugar).await.unwrap();

    // the stored observation before this one has no vitals of its own
    let sugar_again = Observation::new("mother-1").with_blood_sugar(105.0).recorded_at(now);
    let outcome = s.engine.assess(&profile(), sugar_again).await.unwrap();

    let features = outcome.assessment.features;
    assert_eq!(features.systolic_bp, 118.0);
    assert_eq!(features.diastolic_bp, 76.0);
    assert_eq!(features.heart_rate, 75.0);
    assert_eq!(features.bmi, 33.0);
    assert_eq!(features.blood_sugar, 105.0);
    assert_eq!(s.engine.observations("mother-1").await.unwrap().len(), 3);
}

#[tokio::test]
async fn elevated_sugar_alone_is_driven_by_diabetes_scorer() {
    let s = setup(contacts());
    let observation = Observation::new("mother-1")
        .with_bp(115.0, 75.0)
        .with_blood_sugar(135.0)
        .with_bmi(24.0)
        .with_heart_rate(76.0);

    let outcome = s.engine.assess(&profile(), observation).await.unwrap();
    let assessment = outcome.assessment;

    assert_eq!(
        assessment.driver,
        ScoreDriver::Condition(Condition::GestationalDiabetes)
    );
    assert_eq!(assessment.risk_level, RiskLevel::Medium);
    assert_eq!(assessment.risk_score, 40.0);

    let gdm = assessment.condition(Condition::GestationalDiabetes).unwrap();
    assert_eq!(gdm.level, RiskLevel::Medium);
    assert_eq!(
        assessment.condition(Condition::Preeclampsia).unwrap().level,
        RiskLevel::Low
    );
    assert!(outcome.alert.is_none());
}

#[tokio::test]
async fn out_of_range_vital_is_rejected() {
    let s = setup(contacts());
    let observation = normal_observation().with_heart_rate(400.0);

    let err = s.engine.assess(&profile(), observation).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Assessment(AssessmentError::Validation { feature: "heart_rate", .. })
    ));
    assert!(s.assessments.is_empty().await);
}

#[tokio::test]
async fn unready_classifier_fails_every_request() {
    let engine = RiskEngine::builder(
        Arc::new(RiskClassifier::load(&ArtifactPaths::in_dir("/nonexistent/models"))),
        Arc::new(MockMessagingGateway::new()),
        Arc::new(InMemoryContactDirectory::new()),
    )
    .build();

    let err = engine.assess(&profile(), normal_observation()).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Assessment(AssessmentError::ModelNotReady(_))
    ));
    assert!(!err.is_recoverable());
    assert!(engine.latest_assessment("mother-1").await.unwrap().is_none());
}

#[tokio::test]
async fn high_level_always_carries_an_alert() {
    let s = setup(contacts());

    let observations = vec![
        normal_observation(),
        high_observation(),
        high_observation(),
        normal_observation(),
        high_observation(),
    ];
    let mut alert_ids = Vec::new();
    for observation in observations {
        let outcome = s.engine.assess(&profile(), observation).await.unwrap();
        assert_eq!(
            outcome.assessment.risk_level == RiskLevel::High,
            outcome.alert.is_some()
        );
        if let Some(handle) = outcome.dispatch {
            handle.await.unwrap();
        }
        if let Some(alert) = outcome.alert {
            alert_ids.push(alert.id);
        }
    }

    // one open alert per subject: every High reused the first one
    assert_eq!(alert_ids.len(), 3);
    assert!(alert_ids.iter().all(|id| id == &alert_ids[0]));
    assert_eq!(s.engine.alerts_for("mother-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn resolved_alert_allows_new_escalation() {
    let s = setup(contacts());

    let first = s.engine.assess(&profile(), high_observation()).await.unwrap();
    first.dispatch.unwrap().await.unwrap();
    let first_alert = first.alert.unwrap();

    let resolved = s.engine.resolve_alert(&first_alert.id, "midwife-7").await.unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert_eq!(resolved.resolved_by.as_deref(), Some("midwife-7"));

    let err = s.engine.cancel_alert(&first_alert.id, "mother-1").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Escalation(EscalationError::InvalidTransition { .. })
    ));

    let second = s.engine.assess(&profile(), high_observation()).await.unwrap();
    assert!(second.alert_created);
    assert_ne!(second.alert.unwrap().id, first_alert.id);
}

#[tokio::test]
async fn ttl_policy_reuses_recent_assessment() {
    let config = EngineConfig {
        staleness: StalenessPolicy::Ttl { max_age_secs: 3600 },
        ..config()
    };
    let s = setup_with(config, contacts());

    let first = s.engine.assess(&profile(), normal_observation()).await.unwrap();
    assert!(!first.reused);

    // not newer than the stored assessment
    let older = normal_observation().recorded_at(Utc::now() - Duration::minutes(10));
    let second = s.engine.assess(&profile(), older).await.unwrap();
    assert!(second.reused);
    assert_eq!(second.assessment.id, first.assessment.id);

    let newer = normal_observation().recorded_at(Utc::now() + Duration::seconds(5));
    let third = s.engine.assess(&profile(), newer).await.unwrap();
    assert!(!third.reused);
    assert_eq!(s.assessments.len().await, 2);
}

#[tokio::test]
async fn default_policy_always_recomputes() {
    let s = setup(contacts());

    let first = s.engine.assess(&profile(), normal_observation()).await.unwrap();
    let older = normal_observation().recorded_at(Utc::now() - Duration::days(1));
    let second = s.engine.assess(&profile(), older).await.unwrap();

    assert!(!second.reused);
    assert_ne!(second.assessment.id, first.assessment.id);
    assert_eq!(
        s.engine.latest_assessment("mother-1").await.unwrap().unwrap().id,
        second.assessment.id
    );
}

#[tokio::test]
async fn mismatched_profile_is_rejected() {
    let s = setup(contacts());
    let err = s
        .engine
        .assess(&SubjectProfile::new("mother-2"), normal_observation())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SubjectMismatch { .. }));
}

/// Alert store whose backend is down.
struct UnavailableAlertStore;

#[async_trait]
impl AlertRepository for UnavailableAlertStore {
    async fn create_if_none_open(&self, _alert: Alert) -> Result<(Alert, bool), EscalationError> {
        Err(EscalationError::Repository("down".to_string()))
    }

    async fn get(&self, _alert_id: &str) -> Result<Option<Alert>, EscalationError> {
        Err(EscalationError::Repository("down".to_string()))
    }

    async fn open_for_subject(&self, _subject_id: &str) -> Result<Option<Alert>, EscalationError> {
        Err(EscalationError::Repository("down".to_string()))
    }

    async fn list_for_subject(&self, _subject_id: &str) -> Result<Vec<Alert>, EscalationError> {
        Err(EscalationError::Repository("down".to_string()))
    }

    async fn transition(
        &self,
        _alert_id: &str,
        _next: AlertStatus,
        _actor: Option<&str>,
    ) -> Result<Alert, EscalationError> {
        Err(EscalationError::Repository("down".to_string()))
    }

    async fn record_notification(
        &self,
        _alert_id: &str,
        _summary: NotificationSummary,
    ) -> Result<Alert, EscalationError> {
        Err(EscalationError::Repository("down".to_string()))
    }
}

#[tokio::test]
async fn alert_store_failure_still_returns_stored_assessment() {
    let gateway = Arc::new(MockMessagingGateway::new());
    let engine = RiskEngine::builder(
        classifier(),
        gateway.clone(),
        Arc::new(InMemoryContactDirectory::new().with_contacts(contacts())),
    )
    .config(config())
    .alerts(Arc::new(UnavailableAlertStore))
    .build();

    let outcome = engine.assess(&profile(), high_observation()).await.unwrap();

    assert_eq!(outcome.assessment.risk_level, RiskLevel::High);
    assert!(outcome.alert.is_none());
    assert!(!outcome.alert_created);
    assert!(outcome.dispatch.is_none());
    assert_eq!(
        outcome.escalation_error,
        Some(EscalationError::Repository("down".to_string()))
    );

    let stored = engine.latest_assessment("mother-1").await.unwrap().unwrap();
    assert_eq!(stored.id, outcome.assessment.id);
    assert_eq!(gateway.call_count(), 0);
}
