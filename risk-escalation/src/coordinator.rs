//! Escalation coordinator.
//!
//! Turns a High assessment into an Alert and fans notifications out in the
//! background. Alert creation is synchronous; everything after it runs in a
//! spawned task whose handle is returned to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use risk_assessment::{RiskAssessment, RiskLevel, SubjectProfile};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::EscalationConfig;
use crate::contacts::{resolve_targets, ContactDirectory};
use crate::gateway::{DeliveryReport, LiveEvent, LivePush, MessagingGateway};
use crate::outbox::Outbox;
use crate::store::AlertRepository;
use crate::types::{Alert, AlertStatus, NotificationSummary, Result};

/// Live event kind pushed when an alert is raised.
pub const RISK_ALERT_EVENT: &str = "risk_alert";

/// Result of triggering escalation for one assessment.
#[derive(Debug)]
pub struct Escalation {
    /// The subject's open alert
    pub alert: Alert,
    /// Whether this call created the alert
    pub created: bool,
    /// Background fan-out; `None` when the alert already existed
    pub dispatch: Option<JoinHandle<NotificationSummary>>,
}

/// Counters for notification traffic.
#[derive(Debug, Default)]
pub struct DispatchStats {
    alerts_created: AtomicU64,
    messages_attempted: AtomicU64,
    messages_delivered: AtomicU64,
    messages_failed: AtomicU64,
    live_delivered: AtomicU64,
    live_dropped: AtomicU64,
}

impl DispatchStats {
    fn record_reports(&self, reports: &[DeliveryReport]) {
        let delivered = reports.iter().filter(|r| r.is_delivered()).count() as u64;
        self.messages_attempted
            .fetch_add(reports.len() as u64, Ordering::Relaxed);
        self.messages_delivered.fetch_add(delivered, Ordering::Relaxed);
        self.messages_failed
            .fetch_add(reports.len() as u64 - delivered, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            alerts_created: self.alerts_created.load(Ordering::Relaxed),
            messages_attempted: self.messages_attempted.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_failed: self.messages_failed.load(Ordering::Relaxed),
            live_delivered: self.live_delivered.load(Ordering::Relaxed),
            live_dropped: self.live_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStatsSnapshot {
    pub alerts_created: u64,
    pub messages_attempted: u64,
    pub messages_delivered: u64,
    pub messages_failed: u64,
    pub live_delivered: u64,
    pub live_dropped: u64,
}

/// Drives the alert state machine and notification fan-out.
#[derive(Clone)]
pub struct EscalationCoordinator {
    config: EscalationConfig,
    alerts: Arc<dyn AlertRepository>,
    contacts: Arc<dyn ContactDirectory>,
    outbox: Arc<Outbox>,
    live: Arc<dyn LivePush>,
    stats: Arc<DispatchStats>,
}

impl EscalationCoordinator {
    pub fn new(
        config: EscalationConfig,
        alerts: Arc<dyn AlertRepository>,
        contacts: Arc<dyn ContactDirectory>,
        gateway: Arc<dyn MessagingGateway>,
        live: Arc<dyn LivePush>,
    ) -> Self {
        let outbox = Arc::new(Outbox::new(gateway, config.clone()));
        Self {
            config,
            alerts,
            contacts,
            outbox,
            live,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Escalate a High assessment.
    ///
    /// Returns `None` for Low and Medium. For High, returns the subject's open
    /// alert; notifications are dispatched only when this call created it.
    pub async fn trigger(
        &self,
        assessment: &RiskAssessment,
        profile: &SubjectProfile,
    ) -> Result<Option<Escalation>> {
        if assessment.risk_level != RiskLevel::High {
            return Ok(None);
        }

        let candidate = Alert::new(
            assessment.subject_id.clone(),
            assessment.id.clone(),
            self.config.severity,
        );
        let (alert, created) = self.alerts.create_if_none_open(candidate).await?;

        if !created {
            debug!(
                subject_id = %assessment.subject_id,
                alert_id = %alert.id,
                "Reusing open alert, notifications not repeated"
            );
            return Ok(Some(Escalation {
                alert,
                created,
                dispatch: None,
            }));
        }

        self.stats.alerts_created.fetch_add(1, Ordering::Relaxed);
        info!(
            subject_id = %assessment.subject_id,
            alert_id = %alert.id,
            risk_score = assessment.risk_score,
            "Escalation triggered"
        );

        let dispatch = tokio::spawn({
            let this = self.clone();
            let alert = alert.clone();
            let assessment = assessment.clone();
            let profile = profile.clone();
            async move { this.dispatch(alert, assessment, profile).await }
        });

        Ok(Some(Escalation {
            alert,
            created,
            dispatch: Some(dispatch),
        }))
    }

    /// Background fan-out for a newly created alert.
    async fn dispatch(
        &self,
        alert: Alert,
        assessment: RiskAssessment,
        profile: SubjectProfile,
    ) -> NotificationSummary {
        let vars = [
            ("subject_id", alert.subject_id.clone()),
            ("risk_score", assessment.risk_score.to_string()),
            ("alert_id", alert.id.clone()),
        ];

        let contacts = match self.contacts.contacts_for(&alert.subject_id).await {
            Ok(contacts) => contacts,
            Err(e) => {
                error!(alert_id = %alert.id, error = %e, "Contact lookup failed");
                Vec::new()
            }
        };
        let targets: Vec<String> = resolve_targets(&contacts, self.config.max_contacts)
            .into_iter()
            .map(|c| c.phone)
            .collect();
        if targets.is_empty() {
            warn!(subject_id = %alert.subject_id, alert_id = %alert.id, "No contacts on file");
        }

        let subject_target: Vec<String> = profile
            .phone
            .iter()
            .filter(|p| !p.trim().is_empty())
            .cloned()
            .collect();

        let contact_body = render(&self.config.contact_template, &vars);
        let subject_body = render(&self.config.subject_template, &vars);
        let (contact_reports, subject_reports) = futures::join!(
            self.outbox.deliver(&alert.id, &targets, &contact_body),
            self.outbox.deliver(&alert.id, &subject_target, &subject_body),
        );
        self.stats.record_reports(&contact_reports);
        self.stats.record_reports(&subject_reports);

        let event = LiveEvent {
            kind: RISK_ALERT_EVENT.to_string(),
            payload: serde_json::json!({
                "alert_id": alert.id,
                "assessment_id": assessment.id,
                "risk_level": assessment.risk_level,
                "risk_score": assessment.risk_score,
                "recommendations": assessment.recommendations,
            }),
        };
        let live_pushes = self.live.push(&alert.subject_id, event).await;
        if live_pushes > 0 {
            self.stats
                .live_delivered
                .fetch_add(live_pushes as u64, Ordering::Relaxed);
        } else {
            self.stats.live_dropped.fetch_add(1, Ordering::Relaxed);
            warn!(subject_id = %alert.subject_id, "Subject not connected, live push dropped");
        }

        let delivered = contact_reports.iter().filter(|r| r.is_delivered()).count();
        let summary = NotificationSummary {
            delivered,
            failed: contact_reports.len() - delivered,
            subject_notified: subject_reports.iter().any(|r| r.is_delivered()),
            live_pushes,
        };

        match self.alerts.record_notification(&alert.id, summary.clone()).await {
            Ok(updated) => info!(
                alert_id = %alert.id,
                status = %updated.status,
                delivered = summary.delivered,
                failed = summary.failed,
                "Escalation dispatch finished"
            ),
            Err(e) => error!(alert_id = %alert.id, error = %e, "Failed to record notification outcome"),
        }

        summary
    }

    /// Mark an open alert resolved.
    pub async fn resolve_alert(&self, alert_id: &str, actor: &str) -> Result<Alert> {
        self.alerts
            .transition(alert_id, AlertStatus::Resolved, Some(actor))
            .await
    }

    /// Cancel an alert that has not notified anyone yet.
    pub async fn cancel_alert(&self, alert_id: &str, actor: &str) -> Result<Alert> {
        self.alerts
            .transition(alert_id, AlertStatus::Cancelled, Some(actor))
            .await
    }

    pub async fn alert(&self, alert_id: &str) -> Result<Option<Alert>> {
        self.alerts.get(alert_id).await
    }

    /// The subject's Active or ContactsNotified alert.
    pub async fn open_alert(&self, subject_id: &str) -> Result<Option<Alert>> {
        self.alerts.open_for_subject(subject_id).await
    }

    pub async fn alerts_for(&self, subject_id: &str) -> Result<Vec<Alert>> {
        self.alerts.list_for_subject(subject_id).await
    }

    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }
}

/// Substitute `{{key}}` placeholders.
fn render(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{}}}}}", key), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::InMemoryContactDirectory;
    use crate::gateway::{LiveChannelRegistry, MockMessagingGateway};
    use crate::store::InMemoryAlertStore;
    use crate::types::{Contact, EscalationError};
    use risk_assessment::{ClassifierPrediction, FeatureVector, RiskAggregator};

    fn features() -> FeatureVector {
        FeatureVector {
            age: 30.0,
            systolic_bp: 150.0,
            diastolic_bp: 95.0,
            blood_sugar: 140.0,
            body_temp: 98.0,
            bmi: 31.0,
            previous_complications: true,
            preexisting_diabetes: false,
            gestational_diabetes: false,
            mental_health: false,
            heart_rate: 80.0,
        }
    }

    fn assessment(subject: &str, high_probability: f64) -> RiskAssessment {
        let prediction = ClassifierPrediction {
            level: RiskLevel::High,
            class_probability: high_probability,
            confidence: high_probability,
            probabilities: Vec::new(),
        };
        RiskAggregator::new().aggregate(subject, None, features(), prediction, Vec::new())
    }

    struct Harness {
        coordinator: EscalationCoordinator,
        gateway: Arc<MockMessagingGateway>,
        alerts: Arc<InMemoryAlertStore>,
        live: Arc<LiveChannelRegistry>,
    }

    fn harness(contacts: Vec<Contact>, gateway: MockMessagingGateway) -> Harness {
        let gateway = Arc::new(gateway);
        let alerts = Arc::new(InMemoryAlertStore::new());
        let live = Arc::new(LiveChannelRegistry::new());
        let config = EscalationConfig {
            max_attempts: 1,
            ..Default::default()
        };
        let coordinator = EscalationCoordinator::new(
            config,
            alerts.clone(),
            Arc::new(InMemoryContactDirectory::new().with_contacts(contacts)),
            gateway.clone(),
            live.clone(),
        );
        Harness {
            coordinator,
            gateway,
            alerts,
            live,
        }
    }

    fn profile() -> SubjectProfile {
        SubjectProfile::new("s1").with_phone("+2547000")
    }

    #[tokio::test]
    async fn test_low_and_medium_do_not_escalate() {
        let h = harness(Vec::new(), MockMessagingGateway::new());

        for p in [0.1, 0.5] {
            let result = h.coordinator.trigger(&assessment("s1", p), &profile()).await.unwrap();
            assert!(result.is_none());
        }
        assert!(h.alerts.is_empty().await);
    }

    #[tokio::test]
    async fn test_high_risk_notifies_contacts() {
        let contacts = vec![
            Contact::new("s1", "Amina", "+2547001").primary(),
            Contact::new("s1", "Joy", "+2547002"),
        ];
        let h = harness(contacts, MockMessagingGateway::new());
        let mut channel = h.live.connect("s1");

        let escalation = h
            .coordinator
            .trigger(&assessment("s1", 0.9), &profile())
            .await
            .unwrap()
            .unwrap();
        assert!(escalation.created);
        assert_eq!(escalation.alert.status, AlertStatus::Active);

        let summary = escalation.dispatch.unwrap().await.unwrap();
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, 0);
        assert!(summary.subject_notified);
        assert_eq!(summary.live_pushes, 1);

        let stored = h.alerts.get(&escalation.alert.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::ContactsNotified);
        assert!(stored.contacts_notified);

        let sent = h.gateway.sent().await;
        let contact_batch = sent
            .iter()
            .find(|b| b.destinations == vec!["+2547001".to_string()])
            .unwrap();
        assert!(contact_batch.body.contains("s1"));
        assert!(!contact_batch.body.contains("{{"));

        let event = channel.try_recv().unwrap();
        assert_eq!(event.kind, RISK_ALERT_EVENT);
        assert_eq!(event.payload["alert_id"], escalation.alert.id.as_str());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_triggers_create_one_alert() {
        let contacts = vec![Contact::new("s1", "Amina", "+2547001").primary()];
        let h = harness(contacts, MockMessagingGateway::new());
        let assessment = assessment("s1", 0.9);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = h.coordinator.clone();
                let assessment = assessment.clone();
                tokio::spawn(async move { coordinator.trigger(&assessment, &profile()).await })
            })
            .collect();

        let mut alert_ids = Vec::new();
        let mut created = 0;
        for task in tasks {
            let escalation = task.await.unwrap().unwrap().unwrap();
            if escalation.created {
                created += 1;
                escalation.dispatch.unwrap().await.unwrap();
            } else {
                assert!(escalation.dispatch.is_none());
            }
            alert_ids.push(escalation.alert.id);
        }

        assert_eq!(created, 1);
        assert!(alert_ids.iter().all(|id| id == &alert_ids[0]));
        assert_eq!(h.alerts.len().await, 1);
        assert_eq!(h.coordinator.stats().alerts_created, 1);

        // one contact batch and one subject batch
        assert_eq!(h.gateway.call_count(), 2);
        assert_eq!(h.coordinator.outbox().recent(10).await.len(), 2);
    }

    #[tokio::test]
    async fn test_no_contacts_still_notifies_subject() {
        let h = harness(Vec::new(), MockMessagingGateway::new());

        let escalation = h
            .coordinator
            .trigger(&assessment("s1", 0.9), &profile())
            .await
            .unwrap()
            .unwrap();
        let summary = escalation.dispatch.unwrap().await.unwrap();

        assert_eq!(summary.delivered, 0);
        assert!(summary.subject_notified);
        assert_eq!(h.gateway.destinations().await, vec!["+2547000".to_string()]);

        let stored = h.alerts.get(&escalation.alert.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Active);
        assert!(!stored.contacts_notified);
    }

    #[tokio::test]
    async fn test_failed_delivery_leaves_alert_active() {
        let contacts = vec![Contact::new("s1", "Amina", "+2547001")];
        let h = harness(contacts, MockMessagingGateway::new().failing("+2547001"));

        let escalation = h
            .coordinator
            .trigger(&assessment("s1", 0.9), &profile())
            .await
            .unwrap()
            .unwrap();
        let summary = escalation.dispatch.unwrap().await.unwrap();

        assert_eq!(summary.failed, 1);
        let stored = h.alerts.get(&escalation.alert.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Active);

        let stats = h.coordinator.stats();
        assert_eq!(stats.alerts_created, 1);
        assert_eq!(stats.messages_attempted, 2);
        assert_eq!(stats.messages_failed, 1);
        assert_eq!(stats.live_dropped, 1);
    }

    #[tokio::test]
    async fn test_open_alert_is_reused() {
        let contacts = vec![Contact::new("s1", "Amina", "+2547001")];
        let h = harness(contacts, MockMessagingGateway::new());

        let first = h
            .coordinator
            .trigger(&assessment("s1", 0.9), &profile())
            .await
            .unwrap()
            .unwrap();
        first.dispatch.unwrap().await.unwrap();

        let second = h
            .coordinator
            .trigger(&assessment("s1", 0.95), &profile())
            .await
            .unwrap()
            .unwrap();
        assert!(!second.created);
        assert!(second.dispatch.is_none());
        assert_eq!(second.alert.id, first.alert.id);
        assert_eq!(h.gateway.call_count(), 2);
    }

    #[tokio::test]
    async fn test_resolve_and_cancel() {
        let h = harness(Vec::new(), MockMessagingGateway::new());

        let escalation = h
            .coordinator
            .trigger(&assessment("s1", 0.9), &profile())
            .await
            .unwrap()
            .unwrap();
        escalation.dispatch.unwrap().await.unwrap();

        let cancelled = h
            .coordinator
            .cancel_alert(&escalation.alert.id, "s1")
            .await
            .unwrap();
        assert_eq!(cancelled.status, AlertStatus::Cancelled);
        assert_eq!(cancelled.resolved_by.as_deref(), Some("s1"));

        let err = h
            .coordinator
            .resolve_alert(&escalation.alert.id, "s1")
            .await
            .unwrap_err();
        assert!(matches!(err, EscalationError::InvalidTransition { .. }));

        // a closed alert lets the next High assessment raise a new one
        let next = h
            .coordinator
            .trigger(&assessment("s1", 0.9), &profile())
            .await
            .unwrap()
            .unwrap();
        assert!(next.created);
        let resolved = h
            .coordinator
            .resolve_alert(&next.alert.id, "midwife-7")
            .await
            .unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert_eq!(h.coordinator.alerts_for("s1").await.unwrap().len(), 2);
    }

    #[test]
    fn test_render_template() {
        let vars = [("subject_id", "s1".to_string()), ("risk_score", "82.5".to_string())];
        assert_eq!(
            render("{{subject_id}} scored {{risk_score}} {{unknown}}", &vars),
            "s1 scored 82.5 {{unknown}}"
        );
    }
}
