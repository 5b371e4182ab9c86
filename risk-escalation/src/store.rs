//! Alert persistence.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::types::{Alert, AlertStatus, EscalationError, NotificationSummary, Result};

/// Storage for alerts. Alerts are never deleted.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Insert `alert` unless the subject already has an open one.
    ///
    /// Returns the stored open alert and whether it was created by this call.
    async fn create_if_none_open(&self, alert: Alert) -> Result<(Alert, bool)>;

    async fn get(&self, alert_id: &str) -> Result<Option<Alert>>;

    /// The subject's open (Active or ContactsNotified) alert, if any.
    async fn open_for_subject(&self, subject_id: &str) -> Result<Option<Alert>>;

    /// All alerts for a subject, newest first.
    async fn list_for_subject(&self, subject_id: &str) -> Result<Vec<Alert>>;

    /// Apply a state-machine transition.
    async fn transition(&self, alert_id: &str, next: AlertStatus, actor: Option<&str>) -> Result<Alert>;

    /// Store the fan-out summary. Any delivered contact message sets
    /// `contacts_notified`, and an Active alert moves to ContactsNotified.
    async fn record_notification(&self, alert_id: &str, summary: NotificationSummary) -> Result<Alert>;
}

/// In-memory alert store.
#[derive(Default)]
pub struct InMemoryAlertStore {
    alerts: Arc<RwLock<HashMap<String, Alert>>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.alerts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.alerts.read().await.is_empty()
    }
}

#[async_trait]
impl AlertRepository for InMemoryAlertStore {
    async fn create_if_none_open(&self, alert: Alert) -> Result<(Alert, bool)> {
        let mut alerts = self.alerts.write().await;

        if let Some(open) = alerts
            .values()
            .find(|a| a.subject_id == alert.subject_id && a.status.is_open())
        {
            debug!(
                subject_id = %alert.subject_id,
                alert_id = %open.id,
                "Open alert already exists"
            );
            return Ok((open.clone(), false));
        }

        info!(
            subject_id = %alert.subject_id,
            alert_id = %alert.id,
            severity = %alert.severity.as_str(),
            "Alert created"
        );
        alerts.insert(alert.id.clone(), alert.clone());
        Ok((alert, true))
    }

    async fn get(&self, alert_id: &str) -> Result<Option<Alert>> {
        Ok(self.alerts.read().await.get(alert_id).cloned())
    }

    async fn open_for_subject(&self, subject_id: &str) -> Result<Option<Alert>> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .values()
            .find(|a| a.subject_id == subject_id && a.status.is_open())
            .cloned())
    }

    async fn list_for_subject(&self, subject_id: &str) -> Result<Vec<Alert>> {
        let alerts = self.alerts.read().await;
        let mut list: Vec<Alert> = alerts
            .values()
            .filter(|a| a.subject_id == subject_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn transition(&self, alert_id: &str, next: AlertStatus, actor: Option<&str>) -> Result<Alert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .get_mut(alert_id)
            .ok_or_else(|| EscalationError::AlertNotFound(alert_id.to_string()))?;

        let from = alert.status;
        alert.transition(next, actor)?;
        info!(alert_id = %alert_id, from = %from, to = %next, "Alert status updated");
        Ok(alert.clone())
    }

    async fn record_notification(&self, alert_id: &str, summary: NotificationSummary) -> Result<Alert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .get_mut(alert_id)
            .ok_or_else(|| EscalationError::AlertNotFound(alert_id.to_string()))?;

        if summary.delivered > 0 {
            if alert.status == AlertStatus::Active {
                alert.transition(AlertStatus::ContactsNotified, None)?;
            } else {
                // resolved before dispatch finished; keep the status
                alert.contacts_notified = true;
            }
        }
        alert.notification_summary = Some(summary);
        alert.updated_at = chrono::Utc::now();
        Ok(alert.clone())
    }
}
